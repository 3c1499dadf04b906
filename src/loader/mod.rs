// Document loading
// Dispatches on file extension to the matching parser


mod pdf;
mod pptx;
mod text;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RagError, Result};

/// Extensions accepted by [`load_document`], lowercase and without the dot
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "pptx"];

/// A block of document text together with where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path of the file the text was read from
    pub source: String,
    /// 1-based page (PDF) number
    pub page: Option<u32>,
    /// Position of this chunk within its split batch, set by the splitter
    pub chunk_index: Option<u32>,
}

impl Document {
    #[inline]
    pub fn new(page_content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                ..DocumentMetadata::default()
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.page = Some(page);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
    Presentation,
}

impl DocumentFormat {
    /// Resolve the format of `path` from its extension, case-insensitively
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            "pptx" => Ok(Self::Presentation),
            "" => Err(RagError::UnsupportedFormat("(none)".to_string())),
            other => Err(RagError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

impl fmt::Display for DocumentFormat {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("PDF"),
            Self::Text => f.write_str("plain text"),
            Self::Presentation => f.write_str("PowerPoint"),
        }
    }
}

/// Returns true when `path` has one of the [`SUPPORTED_EXTENSIONS`]
#[inline]
pub fn is_supported(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_ok()
}

/// Load a file into raw documents, choosing the parser by extension
#[inline]
pub fn load_document(path: &Path) -> Result<Vec<Document>> {
    let format = DocumentFormat::from_path(path)?;
    debug!("Loading {} as {}", path.display(), format);

    let documents = match format {
        DocumentFormat::Pdf => pdf::load(path)?,
        DocumentFormat::Text => text::load(path)?,
        DocumentFormat::Presentation => pptx::load(path)?,
    };

    debug!(
        "Loaded {} document(s) from {}",
        documents.len(),
        path.display()
    );
    Ok(documents)
}
