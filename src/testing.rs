// Test doubles and fixture writers shared by unit tests

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use zip::write::SimpleFileOptions;

use crate::Result;
use crate::llm::{ChatMessage, ChatModel, Embedder};

pub const HASH_DIMENSION: usize = 256;

/// Deterministic bag-of-words embedder: texts sharing words get close vectors
#[derive(Debug, Default)]
pub struct HashEmbedder {
    calls: Mutex<usize>,
}

impl HashEmbedder {
    pub fn embed(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; HASH_DIMENSION];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let slot = usize::try_from(hasher.finish() % HASH_DIMENSION as u64)
                .expect("slot fits in usize");
            vector[slot] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            vector[0] = 1.0;
        } else {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("lock")
    }
}

impl Embedder for HashEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        *self.calls.lock().expect("lock") += 1;
        Ok(texts.iter().map(|t| Self::embed(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// Chat model that answers by recognising the prompt it was sent:
/// extraction prompts echo their context (or `NO_OUTPUT` when the context
/// contains `drop_marker`), condense prompts return the follow-up tagged
/// with " (standalone)",
/// anything else gets `answer`.
#[derive(Debug)]
pub struct ScriptedChat {
    pub answer: String,
    pub drop_marker: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            drop_marker: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn dropping(mut self, marker: &str) -> Self {
        self.drop_marker = Some(marker.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

impl ChatModel for ScriptedChat {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().expect("lock").push(prompt.clone());

        if prompt.contains("Extracted relevant parts:") {
            let context = prompt
                .split_once(">>>\n")
                .and_then(|(_, rest)| rest.rsplit_once("\n>>>"))
                .map(|(context, _)| context.to_string())
                .unwrap_or_default();

            let dropped = self
                .drop_marker
                .as_deref()
                .is_some_and(|marker| context.contains(marker));
            return Ok(if dropped {
                "NO_OUTPUT".to_string()
            } else {
                context
            });
        }

        if prompt.contains("Standalone question:") {
            let follow_up = prompt
                .split_once("Follow Up Input: ")
                .and_then(|(_, rest)| rest.split_once('\n'))
                .map(|(question, _)| question.to_string())
                .unwrap_or_default();
            return Ok(format!("{follow_up} (standalone)"));
        }

        Ok(self.answer.clone())
    }

    fn model_name(&self) -> &str {
        "scripted-chat"
    }
}

/// Write a PDF with one Courier text line per page
pub fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 14.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).expect("page count fits");
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).expect("pdf written");
}

/// Write a minimal PPTX whose slides each hold the given paragraphs
pub fn write_pptx(path: &Path, slides: &[&[&str]]) {
    let file = std::fs::File::create(path).expect("pptx created");
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)
        .expect("entry started");
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
    )
    .expect("entry written");

    for (i, paragraphs) in slides.iter().enumerate() {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{p}</a:t></a:r></a:p>"))
            .collect::<Vec<_>>()
            .concat();
        let xml = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
                r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
                "<p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"
            ),
            body
        );

        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
            .expect("entry started");
        zip.write_all(xml.as_bytes()).expect("entry written");
    }

    // Not slides, must be skipped
    zip.start_file("ppt/slides/_rels/slide1.xml.rels", options)
        .expect("entry started");
    zip.write_all(b"<Relationships/>").expect("entry written");
    zip.start_file("ppt/slideLayouts/slideLayout1.xml", options)
        .expect("entry started");
    zip.write_all(b"<p:sldLayout/>").expect("entry written");

    zip.finish().expect("zip finished");
}
