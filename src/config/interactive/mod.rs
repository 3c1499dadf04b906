
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, ProviderConfig, ProviderKind};

const PROVIDERS: [ProviderKind; 2] = [ProviderKind::Mistral, ProviderKind::Ollama];

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 RAG QNA Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Provider Configuration").bold().yellow());
    eprintln!("Choose the service used for chat completions and embeddings.");
    eprintln!();

    configure_provider(&mut config.provider)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_provider_connection(&config.provider) {
        eprintln!("{}", style("✓ Provider connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to the provider").yellow()
        );
        eprintln!("You can continue, but make sure the provider is reachable before processing documents.");
    }

    if config.provider.kind == ProviderKind::Mistral && config.provider.api_key().is_none() {
        eprintln!(
            "{}",
            style(format!(
                "⚠ {} is not set; add it to your environment or a .env file",
                config.provider.api_key_env
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Provider Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.provider.kind).cyan());
    eprintln!("  Base URL: {}", style(&config.provider.base_url).cyan());
    eprintln!("  Chat Model: {}", style(&config.provider.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.provider.embedding_model).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.provider.batch_size).cyan());
    let key_state = if config.provider.api_key().is_some() {
        style("set").green()
    } else {
        style("not set").red()
    };
    eprintln!(
        "  API Key ({}): {}",
        config.provider.api_key_env, key_state
    );

    eprintln!();
    eprintln!("{}", style("Pipeline Settings:").bold().yellow());
    eprintln!(
        "  Chunking: {} chars, {} overlap",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!(
        "  Retrieval: {} (k={}, fetch_k={}, lambda={})",
        style(config.retrieval.search_type).cyan(),
        config.retrieval.k,
        config.retrieval.fetch_k,
        config.retrieval.lambda_mult
    );
    eprintln!(
        "  Vector Store: {} (collection {})",
        style(config.vector_store.persist_directory.display()).cyan(),
        style(&config.vector_store.collection_name).cyan()
    );
    eprintln!(
        "  Documents Directory: {}",
        style(config.documents_dir.display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_provider(provider: &mut ProviderConfig) -> Result<()> {
    let default_index = PROVIDERS
        .iter()
        .position(|&p| p == provider.kind)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("LLM provider")
        .default(default_index)
        .items(&PROVIDERS)
        .interact()?;

    let kind = PROVIDERS[provider_index];
    if kind != provider.kind {
        *provider = ProviderConfig::for_kind(kind);
    }

    let base_url: String = Input::new()
        .with_prompt("Provider base URL")
        .default(provider.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            ProviderConfig {
                base_url: input.clone(),
                ..provider.clone()
            }
            .url()
            .map(|_| ())
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(provider.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(provider.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    if kind == ProviderKind::Mistral {
        let api_key_env: String = Input::new()
            .with_prompt("Environment variable holding the API key")
            .default(provider.api_key_env.clone())
            .interact_text()?;
        provider.set_api_key_env(api_key_env)?;
    }

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(provider.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 512 {
                Err("Batch size must be 512 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    provider.set_base_url(base_url)?;
    provider.set_chat_model(chat_model)?;
    provider.set_embedding_model(embedding_model)?;
    provider.set_batch_size(batch_size)?;

    Ok(())
}

/// Any HTTP answer (even 401) means the server is reachable
fn test_provider_connection(provider: &ProviderConfig) -> bool {
    let path = match provider.kind {
        ProviderKind::Mistral => "/v1/models",
        ProviderKind::Ollama => "/api/version",
    };
    let Some(url) = provider.url().ok().and_then(|base| base.join(path).ok()) else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
