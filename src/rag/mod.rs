// Conversation orchestrator
// Tracks added/processed files and owns the store, retriever, chain and memory


use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::chain::{ConversationMemory, ConversationalRetrievalChain};
use crate::config::Config;
use crate::database::lancedb::{VectorStore, VectorStoreConfig};
use crate::llm::{ChatModel, Embedder};
use crate::loader::{Document, load_document};
use crate::prompt::{PromptTemplate, get_prompt};
use crate::retriever::{ContextualCompressionRetriever, RetrieverConfig, build_retriever};
use crate::splitter::{ChunkingConfig, TextSplitter};
use crate::{RagError, Result};

/// Lifecycle of a [`RagQna`] session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No files added
    Empty,
    /// Files added, but not all processed or the chain is not built yet
    Loaded,
    /// Every added file processed and the chain ready for questions
    Ready,
}

impl fmt::Display for SessionState {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Loaded => f.write_str("loaded"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

#[derive(Default)]
pub struct RagQnaBuilder {
    llm: Option<Arc<dyn ChatModel>>,
    embedder: Option<Arc<dyn Embedder>>,
    chunking: ChunkingConfig,
    retrieval: RetrieverConfig,
    vector_store: VectorStoreConfig,
    prompt: Option<String>,
}

impl RagQnaBuilder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the chunking, retrieval and store sections of `config`
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking: config.chunking.clone(),
            retrieval: config.retrieval.clone(),
            vector_store: config.vector_store.clone(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn llm(mut self, llm: Arc<dyn ChatModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    #[inline]
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[inline]
    #[must_use]
    pub fn chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    #[inline]
    #[must_use]
    pub fn retrieval(mut self, retrieval: RetrieverConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    #[inline]
    #[must_use]
    pub fn vector_store(mut self, vector_store: VectorStoreConfig) -> Self {
        self.vector_store = vector_store;
        self
    }

    /// Custom QA template using `{context}` and `{question}`
    #[inline]
    #[must_use]
    pub fn prompt(mut self, template: impl Into<String>) -> Self {
        self.prompt = Some(template.into());
        self
    }

    #[inline]
    pub async fn build(self) -> Result<RagQna> {
        let llm = self
            .llm
            .ok_or(RagError::UnavailableDependency("Language model"))?;
        let splitter = TextSplitter::new(&self.chunking)?;
        let qa_prompt = get_prompt(self.prompt.as_deref())?;
        let vector_store = VectorStore::new(self.embedder, &self.vector_store).await?;

        Ok(RagQna {
            llm,
            splitter,
            vector_store,
            retrieval: self.retrieval,
            qa_prompt,
            files: Vec::new(),
            processed_files: Vec::new(),
            failed_files: Vec::new(),
            chunks: Vec::new(),
            retriever: None,
            chain: None,
            memory: ConversationMemory::new(),
            chain_dirty: false,
        })
    }
}

/// A question-answering session over a growing set of local documents
pub struct RagQna {
    llm: Arc<dyn ChatModel>,
    splitter: TextSplitter,
    vector_store: VectorStore,
    retrieval: RetrieverConfig,
    qa_prompt: PromptTemplate,
    files: Vec<PathBuf>,
    processed_files: Vec<PathBuf>,
    /// Files whose content could not be loaded, skipped until the next clear
    failed_files: Vec<PathBuf>,
    /// One group of chunks per processed file, in processing order
    chunks: Vec<Vec<Document>>,
    retriever: Option<ContextualCompressionRetriever>,
    chain: Option<ConversationalRetrievalChain>,
    memory: ConversationMemory,
    chain_dirty: bool,
}

impl fmt::Debug for RagQna {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagQna")
            .field("llm", &self.llm.model_name())
            .field("vector_store", &self.vector_store)
            .field("files", &self.files)
            .field("processed_files", &self.processed_files)
            .field("failed_files", &self.failed_files)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RagQna {
    #[inline]
    pub fn builder() -> RagQnaBuilder {
        RagQnaBuilder::new()
    }

    /// Register files for processing.
    ///
    /// Every path is checked before any is added, so a missing file leaves
    /// the session untouched. Paths already registered are skipped. Returns
    /// the number of newly added files.
    #[inline]
    pub fn add_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<usize> {
        if let Some(missing) = paths.iter().map(AsRef::as_ref).find(|p| !p.is_file()) {
            return Err(RagError::MissingFile(missing.to_path_buf()));
        }

        let mut added = 0;
        for path in paths.iter().map(AsRef::as_ref) {
            if self.files.iter().any(|f| f == path) {
                debug!("Skipping already added file {}", path.display());
                continue;
            }
            self.files.push(path.to_path_buf());
            added += 1;
        }

        info!("Added {} file(s), {} total", added, self.files.len());
        Ok(added)
    }

    /// Load, split and store every added file that has not been processed yet,
    /// then rebuild the chain if anything changed.
    ///
    /// Files are handled in the order they were added. A failure stops the
    /// batch: files before it stay processed and those after it remain
    /// pending. A file that cannot be loaded is recorded as failed and is
    /// skipped by later calls, so the rest of the files can still be
    /// processed. Store or provider errors leave the file pending.
    #[inline]
    pub async fn process_files(&mut self) -> Result<()> {
        if self.files.is_empty() {
            return Err(RagError::NoFiles);
        }

        let pending: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|f| !self.processed_files.contains(*f) && !self.failed_files.contains(*f))
            .cloned()
            .collect();

        if !self.failed_files.is_empty() {
            warn!(
                "Skipping {} file(s) that could not be loaded",
                self.failed_files.len()
            );
        }

        if pending.is_empty() {
            debug!("All {} file(s) already processed", self.files.len());
        } else {
            self.process_pending(&pending).await?;
        }

        self.rebuild_chain()
    }

    async fn process_pending(&mut self, pending: &[PathBuf]) -> Result<()> {
        info!("Processing {} file(s)", pending.len());

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(pending.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] Processing {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        for path in pending {
            bar.set_message(path.display().to_string());

            let documents = match load_document(path) {
                Ok(documents) => documents,
                Err(e) => {
                    error!("Failed to load {}: {}", path.display(), e);
                    self.failed_files.push(path.clone());
                    bar.abandon();
                    return Err(e);
                }
            };
            let chunks = match self.store_documents(path, &documents).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    error!("Failed to store {}: {}", path.display(), e);
                    bar.abandon();
                    return Err(e);
                }
            };

            info!("Stored {} chunk(s) from {}", chunks.len(), path.display());
            self.processed_files.push(path.clone());
            self.chunks.push(chunks);
            self.chain_dirty = true;
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(())
    }

    async fn store_documents(&self, path: &Path, documents: &[Document]) -> Result<Vec<Document>> {
        let chunks = self.splitter.split_documents(documents);
        if chunks.is_empty() {
            warn!("No text extracted from {}", path.display());
        }
        self.vector_store.add_documents(&chunks).await?;
        Ok(chunks)
    }

    /// Recompute the retriever and chain when the processed set has changed
    fn rebuild_chain(&mut self) -> Result<()> {
        if !self.chain_dirty && self.chain.is_some() {
            return Ok(());
        }

        let retriever = build_retriever(
            Some(self.vector_store.load()),
            Some(Arc::clone(&self.llm)),
            &self.retrieval,
        )?;
        let chain = ConversationalRetrievalChain::new(
            Arc::clone(&self.llm),
            retriever.clone(),
            self.qa_prompt.clone(),
        )?;

        self.retriever = Some(retriever);
        self.chain = Some(chain);
        self.chain_dirty = false;
        debug!("Rebuilt QA chain over {} file(s)", self.processed_files.len());
        Ok(())
    }

    /// Ask a question in the running conversation and return the answer text
    #[inline]
    pub async fn query(&mut self, question: &str) -> Result<String> {
        if self.state() != SessionState::Ready {
            return Err(RagError::NotInitialized);
        }
        let Some(chain) = self.chain.as_ref() else {
            return Err(RagError::NotInitialized);
        };

        info!("Answering question: {}", question);
        let output = chain.invoke(question, &mut self.memory).await?;
        Ok(output.answer)
    }

    /// Empty the vector store, then forget processed and failed files,
    /// chunks, chain and conversation. Added files are kept so they can be
    /// processed again. If the store cannot be emptied the session is left
    /// as it was.
    #[inline]
    pub async fn clear(&mut self) -> Result<()> {
        self.vector_store.clear().await?;

        self.processed_files.clear();
        self.failed_files.clear();
        self.chunks.clear();
        self.retriever = None;
        self.chain = None;
        self.chain_dirty = false;
        self.memory.clear();
        info!("Session cleared, {} file(s) still added", self.files.len());
        Ok(())
    }

    #[inline]
    pub fn get_files(&self) -> &[PathBuf] {
        &self.files
    }

    #[inline]
    pub fn number_of_files(&self) -> usize {
        self.files.len()
    }

    /// Total chunks produced from all processed files
    #[inline]
    pub fn size_chunks(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    #[inline]
    pub fn get_processed_files(&self) -> &[PathBuf] {
        &self.processed_files
    }

    /// Files that could not be loaded, in the order they failed
    #[inline]
    pub fn get_failed_files(&self) -> &[PathBuf] {
        &self.failed_files
    }

    #[inline]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    #[inline]
    pub fn vector_store(&self) -> &VectorStore {
        &self.vector_store
    }

    #[inline]
    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        if self.files.is_empty() {
            SessionState::Empty
        } else if self.chain.is_some()
            && !self.chain_dirty
            && !self.processed_files.is_empty()
            && self.processed_files.len() + self.failed_files.len() == self.files.len()
        {
            SessionState::Ready
        } else {
            SessionState::Loaded
        }
    }
}
