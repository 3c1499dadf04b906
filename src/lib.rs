use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("File {} does not exist", .0.display())]
    MissingFile(PathBuf),

    #[error("No files to process")]
    NoFiles,

    #[error("QA chain not initialized. Process documents first.")]
    NotInitialized,

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("{0} must be provided")]
    UnavailableDependency(&'static str),

    #[error("Document parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chain;
pub mod commands;
pub mod config;
pub mod database;
pub mod llm;
pub mod loader;
pub mod prompt;
pub mod rag;
pub mod retriever;
pub mod shell;
pub mod splitter;

#[cfg(test)]
pub(crate) mod testing;
