// LanceDB vector database module
// Handles vector storage and similarity search for document chunks


pub mod vector_store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::loader::{Document, DocumentMetadata};

pub use vector_store::{VectorStore, VectorStoreHandle};

/// Where the index lives on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Directory holding the LanceDB dataset; relative paths resolve against
    /// the working directory
    pub persist_directory: PathBuf,
    /// Table name inside the dataset
    pub collection_name: String,
}

impl Default for VectorStoreConfig {
    #[inline]
    fn default() -> Self {
        Self {
            persist_directory: PathBuf::from("vector_store"),
            collection_name: "sample".to_string(),
        }
    }
}

/// One row of the collection: a chunk and its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this row
    pub id: String,
    pub vector: Vec<f32>,
    /// The chunk text
    pub content: String,
    pub metadata: DocumentMetadata,
    /// RFC 3339 timestamp of insertion
    pub created_at: String,
}

impl ChunkRecord {
    #[inline]
    pub fn new(document: &Document, vector: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            content: document.page_content.clone(),
            metadata: document.metadata.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[inline]
    pub fn to_document(&self) -> Document {
        Document {
            page_content: self.content.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Search hit with its cosine distance to the query
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub record: ChunkRecord,
    pub distance: f32,
}

impl SearchResult {
    /// Cosine similarity, higher is closer
    #[inline]
    pub fn similarity_score(&self) -> f32 {
        1.0 - self.distance
    }
}
