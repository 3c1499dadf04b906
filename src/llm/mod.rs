// LLM provider integration
// Chat completion and embedding clients behind provider-neutral traits

pub mod http;
pub mod mistral;
pub mod ollama;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, ProviderKind};
use crate::{RagError, Result};

pub use mistral::MistralClient;
pub use ollama::OllamaClient;

/// Turns text into vectors for similarity search
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Provider("Embedding response was empty".to_string()))
    }

    fn model_name(&self) -> &str;
}

/// Non-streaming chat completion
pub trait ChatModel: Send + Sync {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Single-turn completion of a fully formatted prompt
    fn invoke(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)])
    }

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Build the chat and embedding handles for the configured provider.
///
/// `chat_model` overrides the configured chat model name (the CLI `--model` flag).
#[inline]
pub fn build_models(
    config: &Config,
    chat_model: Option<&str>,
) -> Result<(Arc<dyn ChatModel>, Arc<dyn Embedder>)> {
    let mut provider = config.provider.clone();
    if let Some(model) = chat_model {
        provider
            .set_chat_model(model.to_string())
            .map_err(|e| RagError::Config(e.to_string()))?;
    }

    info!(
        "Using {} provider (chat: {}, embeddings: {})",
        provider.kind, provider.chat_model, provider.embedding_model
    );

    match provider.kind {
        ProviderKind::Mistral => {
            let client = Arc::new(MistralClient::new(&provider)?);
            let chat: Arc<dyn ChatModel> = Arc::<MistralClient>::clone(&client);
            let embedder: Arc<dyn Embedder> = client;
            Ok((chat, embedder))
        }
        ProviderKind::Ollama => {
            let client = Arc::new(OllamaClient::new(&provider)?);
            let chat: Arc<dyn ChatModel> = Arc::<OllamaClient>::clone(&client);
            let embedder: Arc<dyn Embedder> = client;
            Ok((chat, embedder))
        }
    }
}
