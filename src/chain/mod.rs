// Conversational retrieval chain
// Condense follow-up -> retrieve -> stuff context -> answer -> remember

pub mod memory;


use std::sync::Arc;

use tracing::{debug, info};

use crate::Result;
use crate::llm::ChatModel;
use crate::loader::Document;
use crate::prompt::{PromptTemplate, condense_question_prompt};
use crate::retriever::ContextualCompressionRetriever;

pub use memory::{ConversationMemory, Turn};

/// Answer plus the documents it was generated from
#[derive(Debug, Clone)]
pub struct ChainOutput {
    pub answer: String,
    pub source_documents: Vec<Document>,
    /// The question actually sent to retrieval, after condensing
    pub generated_question: String,
}

#[derive(Clone)]
pub struct ConversationalRetrievalChain {
    llm: Arc<dyn ChatModel>,
    retriever: ContextualCompressionRetriever,
    qa_prompt: PromptTemplate,
    condense_prompt: PromptTemplate,
}

impl std::fmt::Debug for ConversationalRetrievalChain {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationalRetrievalChain")
            .field("llm", &self.llm.model_name())
            .field("retriever", &self.retriever)
            .finish_non_exhaustive()
    }
}

impl ConversationalRetrievalChain {
    #[inline]
    pub fn new(
        llm: Arc<dyn ChatModel>,
        retriever: ContextualCompressionRetriever,
        qa_prompt: PromptTemplate,
    ) -> Result<Self> {
        Ok(Self {
            llm,
            retriever,
            qa_prompt,
            condense_prompt: condense_question_prompt()?,
        })
    }

    /// Answer `question` in the context of `memory`, then record the turn
    #[inline]
    pub async fn invoke(
        &self,
        question: &str,
        memory: &mut ConversationMemory,
    ) -> Result<ChainOutput> {
        let generated_question = if memory.is_empty() {
            question.to_string()
        } else {
            let prompt = self.condense_prompt.format(&[
                ("chat_history", &memory.buffer_string()),
                ("question", question),
            ])?;
            let standalone = self.llm.invoke(&prompt)?.trim().to_string();
            debug!("Condensed follow-up into: {}", standalone);
            standalone
        };

        let source_documents = self
            .retriever
            .get_relevant_documents(&generated_question)
            .await?;
        info!(
            "Answering with {} retrieved document(s)",
            source_documents.len()
        );

        let context = source_documents
            .iter()
            .map(|d| d.page_content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = self.qa_prompt.format(&[
            ("context", &context),
            ("question", &generated_question),
        ])?;
        let answer = self.llm.invoke(&prompt)?;

        memory.save_turn(question, answer.clone());

        Ok(ChainOutput {
            answer,
            source_documents,
            generated_question,
        })
    }
}
