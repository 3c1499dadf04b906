use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::build_models;
use crate::loader::is_supported;
use crate::rag::{RagQna, RagQnaBuilder};
use crate::shell::run_shell;

/// Files to ingest for `path`: the supported files directly inside it when it
/// is a directory, else `path` itself
#[inline]
pub fn collect_documents(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in
        fs::read_dir(path).with_context(|| format!("Failed to read directory: {}", path.display()))?
    {
        let file = entry?.path();
        if file.is_file() && is_supported(&file) {
            files.push(file);
        }
    }
    files.sort();

    if files.is_empty() {
        warn!("No supported documents found in {}", path.display());
    }
    Ok(files)
}

/// Build a session with the configured provider, optionally overriding the chat model
#[inline]
pub async fn create_session(config: &Config, model: Option<&str>) -> Result<RagQna> {
    let (llm, embedder) = build_models(config, model)?;
    let rag = RagQnaBuilder::from_config(config)
        .llm(llm)
        .embedder(embedder)
        .build()
        .await?;
    Ok(rag)
}

/// Ingest the documents at `documents` into the vector store
#[inline]
pub async fn init_documents(config: &Config, documents: &Path, model: Option<&str>) -> Result<()> {
    let mut rag = create_session(config, model).await?;

    let files = collect_documents(documents)?;
    info!("Initializing with {} file(s)", files.len());
    rag.add_files(&files)?;
    rag.process_files().await?;

    println!(
        "✅ Initialized RAG system with documents from {}",
        documents.display()
    );
    println!(
        "   {} file(s), {} chunk(s) stored in {}",
        rag.get_processed_files().len(),
        rag.size_chunks(),
        rag.vector_store().persist_directory().display()
    );
    Ok(())
}

/// One-shot questions need a processed session, which does not outlive `init`
#[inline]
pub fn query_documents(config: &Config, question: &str, model: Option<&str>) -> Result<()> {
    build_models(config, model)?;
    info!("Query requested without an initialized session: {}", question);

    println!("❌ Please initialize the system first with 'ragqna init --documents <path>'");
    Ok(())
}

/// Start the interactive menu over the configured documents directory
#[inline]
pub async fn start_shell(config: &Config, model: Option<&str>) -> Result<()> {
    let mut rag = create_session(config, model).await?;
    run_shell(&mut rag, &config.documents_dir).await
}
