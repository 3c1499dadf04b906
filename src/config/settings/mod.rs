
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::database::lancedb::VectorStoreConfig;
use crate::retriever::RetrieverConfig;
use crate::splitter::ChunkingConfig;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory the interactive shell lists documents from
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrieverConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Mistral,
    Ollama,
}

impl fmt::Display for ProviderKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mistral => f.write_str("mistral"),
            Self::Ollama => f.write_str("ollama"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Environment variable holding the API key; ignored by providers without auth
    pub api_key_env: String,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    /// Total attempts per request; 1 disables retries
    pub retry_attempts: u32,
    pub temperature: f32,
}

impl Default for ProviderConfig {
    #[inline]
    fn default() -> Self {
        Self::for_kind(ProviderKind::Mistral)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid API key variable: {0:?} (cannot be empty)")]
    InvalidApiKeyEnv(String),
    #[error("Invalid batch size: {0} (must be between 1 and 512)")]
    InvalidBatchSize(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid chunk size: {0} (must be between 1 and 100000)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must not be larger than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid result count k: {0} (must be between 1 and 100)")]
    InvalidK(usize),
    #[error("fetch_k ({0}) must be at least k ({1})")]
    FetchKTooSmall(usize, usize),
    #[error("Invalid lambda_mult: {0} (must be between 0.0 and 1.0)")]
    InvalidLambda(f32),
    #[error("Invalid collection name: {0:?} (letters, digits, '_' and '-' only)")]
    InvalidCollectionName(String),
    #[error("Persist directory cannot be empty")]
    EmptyPersistDirectory,
    #[error("Persist directory {0:?} must be a dedicated folder outside the documents directory")]
    UnsafePersistDirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            provider: ProviderConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrieverConfig::default(),
            vector_store: VectorStoreConfig::default(),
            base_dir: default_documents_dir(),
        }
    }
}

impl Config {
    /// Default configuration directory, `~/.ragqna`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".ragqna"))
            .or_else(|| dirs::config_dir().map(|config| config.join("ragqna")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when it does not exist
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.validate_chunking_config()?;
        self.validate_retrieval_config()?;
        self.validate_vector_store_config()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(1..=100_000).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.chunk_overlap > config.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                config.chunk_overlap,
                config.chunk_size,
            ));
        }

        Ok(())
    }

    fn validate_retrieval_config(&self) -> Result<(), ConfigError> {
        let config = &self.retrieval;

        if !(1..=100).contains(&config.k) {
            return Err(ConfigError::InvalidK(config.k));
        }

        if config.fetch_k < config.k {
            return Err(ConfigError::FetchKTooSmall(config.fetch_k, config.k));
        }

        if !(0.0..=1.0).contains(&config.lambda_mult) {
            return Err(ConfigError::InvalidLambda(config.lambda_mult));
        }

        Ok(())
    }

    fn validate_vector_store_config(&self) -> Result<(), ConfigError> {
        let config = &self.vector_store;

        if config.persist_directory.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPersistDirectory);
        }
        if persist_directory_is_unsafe(&config.persist_directory, &self.documents_dir)? {
            return Err(ConfigError::UnsafePersistDirectory(
                config.persist_directory.clone(),
            ));
        }

        let name = &config.collection_name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidCollectionName(name.clone()));
        }

        Ok(())
    }
}

/// Clearing the store deletes under the persist directory, so it must not
/// be a bare `.`/`..` or contain the documents directory
fn persist_directory_is_unsafe(persist: &Path, documents: &Path) -> Result<bool, ConfigError> {
    if persist
        .components()
        .all(|c| matches!(c, Component::CurDir | Component::ParentDir))
    {
        return Ok(true);
    }

    if lexical_absolute(documents)?.starts_with(lexical_absolute(persist)?) {
        return Ok(true);
    }

    // Symlinks only show up once both sides exist on disk
    if let (Ok(persist_real), Ok(documents_real)) =
        (fs::canonicalize(persist), fs::canonicalize(documents))
    {
        return Ok(documents_real.starts_with(persist_real));
    }
    Ok(false)
}

/// Absolute form of `path` with `.` and `..` resolved without touching the
/// filesystem
fn lexical_absolute(path: &Path) -> std::io::Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

impl ProviderConfig {
    /// Defaults for a provider: the hosted Mistral API or a local Ollama server
    #[inline]
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Mistral => Self {
                kind,
                base_url: "https://api.mistral.ai".to_string(),
                chat_model: "mistral-large-2407".to_string(),
                embedding_model: "mistral-embed".to_string(),
                api_key_env: "MISTRAL_API_KEY".to_string(),
                batch_size: 32,
                timeout_seconds: 60,
                retry_attempts: 1,
                temperature: 0.0,
            },
            ProviderKind::Ollama => Self {
                kind,
                base_url: "http://localhost:11434".to_string(),
                chat_model: "llama3.1:latest".to_string(),
                embedding_model: "nomic-embed-text:latest".to_string(),
                api_key_env: "OLLAMA_API_KEY".to_string(),
                batch_size: 16,
                timeout_seconds: 120,
                retry_attempts: 1,
                temperature: 0.0,
            },
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.url()?;

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(self.api_key_env.clone()));
        }

        if !(1..=512).contains(&self.batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        Ok(())
    }

    #[inline]
    pub fn url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;

        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(self.base_url.clone()));
        }

        Ok(url)
    }

    /// Read the API key from the configured environment variable
    #[inline]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    #[inline]
    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        let temp_config = ProviderConfig {
            base_url: base_url.clone(),
            ..self.clone()
        };
        temp_config.url()?;
        self.base_url = base_url;
        Ok(())
    }

    #[inline]
    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }

    #[inline]
    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    #[inline]
    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if !(1..=512).contains(&batch_size) {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    #[inline]
    pub fn set_api_key_env(&mut self, name: String) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidApiKeyEnv(name));
        }
        self.api_key_env = name;
        Ok(())
    }
}
