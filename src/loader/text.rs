use std::fs;
use std::path::Path;

use super::Document;
use crate::{RagError, Result};

pub(super) fn load(path: &Path) -> Result<Vec<Document>> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|e| {
        RagError::Parse(format!("{} is not valid UTF-8: {}", path.display(), e))
    })?;

    Ok(vec![Document::new(content, path.to_string_lossy())])
}
