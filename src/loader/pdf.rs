use std::path::Path;

use tracing::warn;

use super::Document;
use crate::{RagError, Result};

/// One document per page, in page order
pub(super) fn load(path: &Path) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load(path)
        .map_err(|e| RagError::Parse(format!("Failed to load PDF {}: {}", path.display(), e)))?;

    let source = path.to_string_lossy();
    let pages = pdf.get_pages();
    let mut documents = Vec::with_capacity(pages.len());

    for page_number in pages.keys().copied() {
        let text = match pdf.extract_text(&[page_number]) {
            Ok(text) => clean_page_text(&text),
            Err(e) => {
                warn!(
                    "Could not extract text from page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
                String::new()
            }
        };

        documents.push(Document::new(text, source.as_ref()).with_page(page_number));
    }

    Ok(documents)
}

fn clean_page_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
