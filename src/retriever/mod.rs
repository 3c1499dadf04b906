// Retrieval over the vector store
// Base similarity/MMR search followed by LLM contextual compression

pub mod compressor;
pub mod mmr;


use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::lancedb::VectorStoreHandle;
use crate::llm::ChatModel;
use crate::loader::Document;
use crate::{RagError, Result};

pub use compressor::LlmChainExtractor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Maximal marginal relevance
    #[default]
    Mmr,
    Similarity,
}

impl fmt::Display for SearchType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mmr => f.write_str("mmr"),
            Self::Similarity => f.write_str("similarity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub search_type: SearchType,
    /// Documents returned per query
    pub k: usize,
    /// Candidates fetched before MMR re-ranking
    pub fetch_k: usize,
    /// 1.0 ranks purely by relevance, 0.0 purely by diversity
    pub lambda_mult: f32,
}

impl Default for RetrieverConfig {
    #[inline]
    fn default() -> Self {
        Self {
            search_type: SearchType::Mmr,
            k: 3,
            fetch_k: 20,
            lambda_mult: 0.5,
        }
    }
}

/// Runs the configured search against the store
#[derive(Debug, Clone)]
pub struct VectorStoreRetriever {
    store: VectorStoreHandle,
    config: RetrieverConfig,
}

impl VectorStoreRetriever {
    #[inline]
    pub fn new(store: VectorStoreHandle, config: RetrieverConfig) -> Self {
        Self { store, config }
    }

    #[inline]
    pub async fn get_relevant_documents(&self, query: &str) -> Result<Vec<Document>> {
        let documents = match self.config.search_type {
            SearchType::Mmr => {
                self.store
                    .max_marginal_relevance_search(
                        query,
                        self.config.k,
                        self.config.fetch_k,
                        self.config.lambda_mult,
                    )
                    .await?
            }
            SearchType::Similarity => self.store.similarity_search(query, self.config.k).await?,
        };

        debug!(
            "{} search returned {} documents",
            self.config.search_type,
            documents.len()
        );
        Ok(documents)
    }
}

/// Base retriever whose results are filtered through an [`LlmChainExtractor`]
#[derive(Debug, Clone)]
pub struct ContextualCompressionRetriever {
    base_retriever: VectorStoreRetriever,
    base_compressor: LlmChainExtractor,
}

impl ContextualCompressionRetriever {
    #[inline]
    pub fn new(base_retriever: VectorStoreRetriever, base_compressor: LlmChainExtractor) -> Self {
        Self {
            base_retriever,
            base_compressor,
        }
    }

    #[inline]
    pub async fn get_relevant_documents(&self, query: &str) -> Result<Vec<Document>> {
        let documents = self.base_retriever.get_relevant_documents(query).await?;
        if documents.is_empty() {
            return Ok(documents);
        }
        self.base_compressor.compress_documents(documents, query)
    }
}

/// Wire a store handle and an LLM into a compressing retriever
#[inline]
pub fn build_retriever(
    store: Option<VectorStoreHandle>,
    llm: Option<Arc<dyn ChatModel>>,
    config: &RetrieverConfig,
) -> Result<ContextualCompressionRetriever> {
    let store = store.ok_or(RagError::UnavailableDependency("Vector store"))?;
    let llm = llm.ok_or(RagError::UnavailableDependency("Language model"))?;

    info!(
        "Building {} retriever (k={}, fetch_k={}, lambda={})",
        config.search_type, config.k, config.fetch_k, config.lambda_mult
    );

    Ok(ContextualCompressionRetriever::new(
        VectorStoreRetriever::new(store, config.clone()),
        LlmChainExtractor::new(llm)?,
    ))
}
