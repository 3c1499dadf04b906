
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::http::JsonHttpClient;
use super::{ChatMessage, ChatModel, Embedder};
use crate::config::ProviderConfig;
use crate::{RagError, Result};

/// Client for the hosted Mistral API (chat completions and embeddings)
#[derive(Debug, Clone)]
pub struct MistralClient {
    http: JsonHttpClient,
    chat_model: String,
    embedding_model: String,
    batch_size: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

impl MistralClient {
    /// Fails when the API key variable named in `config` is unset or blank
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = config
            .url()
            .map_err(|e| RagError::Config(format!("Failed to generate Mistral URL: {}", e)))?;

        let api_key = config.api_key().ok_or_else(|| {
            RagError::Config(format!(
                "{} is not set; export it or add it to a .env file",
                config.api_key_env
            ))
        })?;

        let http = JsonHttpClient::new(
            base_url,
            Duration::from_secs(config.timeout_seconds),
            config.retry_attempts,
        )
        .with_bearer_token(api_key);

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

    /// Verify the key is accepted and both models are offered
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        let models = self.list_models()?;

        for wanted in [&self.chat_model, &self.embedding_model] {
            if !models.iter().any(|m| &m.id == wanted) {
                return Err(RagError::Provider(format!(
                    "Model '{}' is not available for this API key",
                    wanted
                )));
            }
        }

        info!("Health check passed for Mistral API at {}", self.http.base_url());
        Ok(())
    }

    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response: ModelsResponse = self
            .http
            .get_json("v1/models")
            .context("Failed to fetch models")?;

        debug!("Found {} models", response.data.len());
        Ok(response.data)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let mut response: EmbeddingsResponse = self
            .http
            .post_json("v1/embeddings", &request)
            .map_err(|e| RagError::Provider(format!("Failed to generate embeddings: {:#}", e)))?;

        if response.data.len() != texts.len() {
            return Err(RagError::Provider(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for MistralClient {
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

        Ok(embeddings)
    }

    #[inline]
    fn model_name(&self) -> &str {
        &self.embedding_model
    }
}

impl ChatModel for MistralClient {
    #[inline]
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature: self.temperature,
        };

        let response: ChatResponse = self
            .http
            .post_json("v1/chat/completions", &request)
            .map_err(|e| RagError::Provider(format!("Chat request failed: {:#}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Provider("Chat response contained no choices".to_string()))
    }

    #[inline]
    fn model_name(&self) -> &str {
        &self.chat_model
    }
}
