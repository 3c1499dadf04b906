use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use zip::ZipArchive;

use super::Document;
use crate::{RagError, Result};

const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// The whole presentation as a single document, slides in order
pub(super) fn load(path: &Path) -> Result<Vec<Document>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        RagError::Parse(format!("Failed to open presentation {}: {}", path.display(), e))
    })?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_unstable_by_key(|(n, _)| *n);

    let mut slide_texts = Vec::with_capacity(slides.len());
    for (number, name) in slides {
        let mut xml = String::new();
        archive
            .by_name(&name)
            .map_err(|e| RagError::Parse(format!("Missing slide {}: {}", name, e)))?
            .read_to_string(&mut xml)?;

        let text = extract_slide_text(&xml)?;
        debug!("Slide {} has {} characters of text", number, text.len());
        if !text.is_empty() {
            slide_texts.push(text);
        }
    }

    Ok(vec![Document::new(
        slide_texts.join("\n\n"),
        path.to_string_lossy(),
    )])
}

/// `ppt/slides/slide12.xml` -> 12; layouts, notes and rels yield None
pub(super) fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collect `<a:t>` runs, one line per `<a:p>` paragraph
fn extract_slide_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| RagError::Parse(format!("Invalid slide text: {}", err)))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let line = current.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(RagError::Parse(format!("Malformed slide XML: {}", e))),
            _ => {}
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }

    Ok(lines.join("\n"))
}
