
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::http::JsonHttpClient;
use super::{ChatMessage, ChatModel, Embedder};
use crate::config::ProviderConfig;
use crate::{RagError, Result};

/// Client for a local Ollama server, used for both chat and embeddings
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: JsonHttpClient,
    chat_model: String,
    embedding_model: String,
    batch_size: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDetails {
    pub format: Option<String>,
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = config
            .url()
            .map_err(|e| RagError::Config(format!("Failed to generate Ollama URL: {}", e)))?;

        let mut http = JsonHttpClient::new(
            base_url,
            Duration::from_secs(config.timeout_seconds),
            config.retry_attempts,
        );
        // Plain Ollama has no auth, but proxies in front of it may
        if let Some(key) = config.api_key() {
            http = http.with_bearer_token(key);
        }

        Ok(Self {
            http,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            batch_size: config.batch_size.max(1),
            temperature: config.temperature,
        })
    }

    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http = self.http.with_retry_attempts(attempts);
        self
    }

    /// Test connection to the Ollama server and verify both models are pulled
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.http.base_url());

        let models = self.list_models()?;
        for wanted in [&self.chat_model, &self.embedding_model] {
            if !models.iter().any(|m| &m.name == wanted) {
                let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                warn!(
                    "Model {} not found. Available models: {:?}",
                    wanted, available
                );
                return Err(RagError::Provider(format!(
                    "Model '{}' is not available. Available models: {:?}",
                    wanted, available
                )));
            }
        }

        info!(
            "Health check passed for Ollama server at {}",
            self.http.base_url()
        );
        Ok(())
    }

    /// List all locally available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response: ModelsResponse = self
            .http
            .get_json("api/tags")
            .context("Failed to fetch models")?;

        debug!("Found {} models", response.models.len());
        Ok(response.models)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response: EmbedResponse = self
            .http
            .post_json("api/embed", &request)
            .map_err(|e| RagError::Provider(format!("Failed to generate embeddings: {:#}", e)))?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::Provider(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            embeddings.extend(self.embed_batch(batch)?);
        }

        debug!("Generated {} embeddings total", embeddings.len());
        Ok(embeddings)
    }

    #[inline]
    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

impl ChatModel for OllamaClient {
    #[inline]
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response: ChatResponse = self
            .http
            .post_json("api/chat", &request)
            .map_err(|e| RagError::Provider(format!("Chat request failed: {:#}", e)))?;

        Ok(response.message.content)
    }

    #[inline]
    fn model_name(&self) -> &str {
        &self.chat_model
    }
}
