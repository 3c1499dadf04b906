use std::sync::Arc;

use tracing::debug;

use crate::Result;
use crate::llm::ChatModel;
use crate::loader::Document;
use crate::prompt::{NO_OUTPUT, PromptTemplate, extraction_prompt};

/// Shrinks each retrieved document to the parts an LLM judges relevant to
/// the query, dropping documents with nothing relevant
#[derive(Clone)]
pub struct LlmChainExtractor {
    llm: Arc<dyn ChatModel>,
    prompt: PromptTemplate,
}

impl std::fmt::Debug for LlmChainExtractor {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmChainExtractor")
            .field("llm", &self.llm.model_name())
            .finish_non_exhaustive()
    }
}

impl LlmChainExtractor {
    #[inline]
    pub fn new(llm: Arc<dyn ChatModel>) -> Result<Self> {
        Ok(Self {
            llm,
            prompt: extraction_prompt()?,
        })
    }

    /// One LLM call per document, in order
    #[inline]
    pub fn compress_documents(&self, documents: Vec<Document>, query: &str) -> Result<Vec<Document>> {
        let total = documents.len();
        let mut compressed = Vec::with_capacity(total);

        for document in documents {
            let prompt = self.prompt.format(&[
                ("question", query),
                ("context", &document.page_content),
            ])?;
            let output = self.llm.invoke(&prompt)?;
            let extracted = output.trim();

            if extracted.is_empty() || extracted == NO_OUTPUT {
                continue;
            }

            compressed.push(Document {
                page_content: extracted.to_string(),
                metadata: document.metadata,
            });
        }

        debug!("Compressed {} documents down to {}", total, compressed.len());
        Ok(compressed)
    }
}
