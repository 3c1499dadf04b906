#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::loader::Document;
use crate::{RagError, Result};

/// Separators tried in order: paragraphs, lines, words, characters
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Configuration for document chunking, lengths in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length
    pub chunk_size: usize,
    /// Maximum number of characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Recursive character splitter.
///
/// Text is split on the first separator that occurs in it; pieces that are
/// still too long are split again with the remaining separators. Adjacent
/// pieces are then merged back into chunks of at most `chunk_size`
/// characters, carrying up to `chunk_overlap` characters of context from one
/// chunk into the next.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(RagError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }

        if config.chunk_overlap > config.chunk_size {
            return Err(RagError::Config(format!(
                "Got a larger chunk overlap ({}) than chunk size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }

        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
        })
    }

    #[inline]
    #[must_use]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Split every document, keeping its metadata and numbering the chunks
    #[inline]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        let mut chunks = Vec::new();

        for document in documents {
            for text in self.split_text(&document.page_content) {
                let mut metadata = document.metadata.clone();
                metadata.chunk_index = u32::try_from(chunks.len()).ok();
                chunks.push(Document {
                    page_content: text,
                    metadata,
                });
            }
        }

        debug!(
            "Split {} document(s) into {} chunks",
            documents.len(),
            chunks.len()
        );
        chunks
    }

    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        // Use the first separator present in the text; "" always matches
        let mut separator = separators.last().map_or("", String::as_str);
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits = split_keeping_separator(text, separator);

        let mut good_splits = Vec::new();
        for split in splits {
            if char_len(&split) < self.chunk_size {
                good_splits.push(split);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(std::mem::take(&mut good_splits)));
            }

            if remaining.is_empty() {
                final_chunks.push(split);
            } else {
                final_chunks.extend(self.split_recursive(&split, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(good_splits));
        }

        final_chunks
    }

    /// Greedily pack pieces into chunks, keeping a tail of at most
    /// `chunk_overlap` characters as the start of the next chunk
    fn merge_splits(&self, splits: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<(String, usize)> = VecDeque::new();
        let mut total = 0;

        for split in splits {
            let len = char_len(&split);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }

                if !current.is_empty() {
                    push_chunk(&mut chunks, &current);

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        let Some((_, dropped)) = current.pop_front() else {
                            break;
                        };
                        total -= dropped;
                    }
                }
            }

            total += len;
            current.push_back((split, len));
        }

        push_chunk(&mut chunks, &current);
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, pieces: &VecDeque<(String, usize)>) {
    let joined: String = pieces.iter().map(|(piece, _)| piece.as_str()).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split on `separator`, attaching it to the start of the following piece.
/// An empty separator splits into single characters.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = text.split(separator);
    let mut splits = Vec::new();
    if let Some(first) = pieces.next() {
        splits.push(first.to_string());
    }
    for piece in pieces {
        splits.push(format!("{}{}", separator, piece));
    }

    splits.retain(|s| !s.is_empty());
    splits
}

#[inline]
fn char_len(text: &str) -> usize {
    text.chars().count()
}
