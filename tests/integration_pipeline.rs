#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

/// End-to-end session tests through the public API with in-process models
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ragqna::commands::collect_documents;
use ragqna::database::lancedb::VectorStoreConfig;
use ragqna::llm::{ChatMessage, ChatModel, Embedder};
use ragqna::rag::{RagQna, SessionState};
use ragqna::splitter::ChunkingConfig;
use ragqna::{RagError, Result};
use tempfile::TempDir;

const LETTERS: usize = 26;

/// Letter-frequency embedding, enough to tell topics apart in small corpora
struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0_f32; LETTERS + 1];
                for c in text.chars().filter(char::is_ascii_alphabetic) {
                    let slot = (c.to_ascii_lowercase() as u8 - b'a') as usize;
                    vector[slot] += 1.0;
                }
                vector[LETTERS] = 1.0;
                vector
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "letters"
    }
}

/// Echoes extraction contexts back and answers everything else with the
/// last line of the prompt
#[derive(Default)]
struct EchoChat {
    calls: Mutex<usize>,
}

impl ChatModel for EchoChat {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        *self.calls.lock().expect("lock") += 1;
        let prompt = &messages.last().expect("one message").content;

        if let Some((_, rest)) = prompt.split_once(">>>\n") {
            if let Some((context, _)) = rest.rsplit_once("\n>>>") {
                return Ok(context.to_string());
            }
        }
        Ok(format!("Echo: {}", prompt.len()))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

fn write_files(dir: &Path) -> Vec<PathBuf> {
    let files = [
        ("alpha.txt", "Rust is a systems programming language.\n\nIt has no garbage collector."),
        ("beta.txt", "Bread is baked from flour, water, salt and yeast."),
        ("notes.csv", "a,b\n1,2"),
    ];
    files
        .iter()
        .map(|(name, content)| {
            let path = dir.join(name);
            std::fs::write(&path, content).expect("fixture written");
            path
        })
        .collect()
}

async fn session(dir: &Path, chat: Arc<EchoChat>) -> RagQna {
    RagQna::builder()
        .llm(chat)
        .embedder(Arc::new(LetterEmbedder))
        .chunking(ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 10,
        })
        .vector_store(VectorStoreConfig {
            persist_directory: dir.join("vector_store"),
            collection_name: "sample".to_string(),
        })
        .build()
        .await
        .expect("session builds")
}

#[tokio::test]
async fn full_session_lifecycle() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    write_files(temp_dir.path());
    let chat = Arc::new(EchoChat::default());
    let mut rag = session(temp_dir.path(), Arc::clone(&chat)).await;

    let documents = collect_documents(temp_dir.path()).expect("collected");
    assert_eq!(documents.len(), 2, "csv and the store directory are skipped");

    assert_eq!(rag.add_files(&documents).expect("added"), 2);
    assert_eq!(rag.state(), SessionState::Loaded);

    rag.process_files().await.expect("processed");
    assert_eq!(rag.state(), SessionState::Ready);
    assert_eq!(rag.get_processed_files(), documents.as_slice());
    assert!(rag.size_chunks() > 2, "small chunk size splits the files");
    assert_eq!(
        rag.vector_store().count().await.expect("count"),
        rag.size_chunks()
    );

    let answer = rag.query("What kind of language is Rust?").await.expect("answer");
    assert!(answer.starts_with("Echo: "));

    let follow_up = rag.query("Does it collect garbage?").await.expect("answer");
    assert!(!follow_up.is_empty());
    assert_eq!(rag.memory().len(), 2);
    assert!(*chat.calls.lock().expect("lock") >= 4);

    rag.clear().await.expect("cleared");
    assert_eq!(rag.number_of_files(), 2);
    assert_eq!(rag.size_chunks(), 0);
    assert!(matches!(
        rag.query("Anything left?").await,
        Err(RagError::NotInitialized)
    ));
}

#[tokio::test]
async fn store_persists_between_sessions() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let files = write_files(temp_dir.path());

    {
        let mut rag = session(temp_dir.path(), Arc::new(EchoChat::default())).await;
        rag.add_files(&files[..1]).expect("added");
        rag.process_files().await.expect("processed");
    }

    let rag = session(temp_dir.path(), Arc::new(EchoChat::default())).await;
    assert!(rag.vector_store().count().await.expect("count") > 0);
    assert_eq!(rag.state(), SessionState::Empty);
}

#[tokio::test]
async fn unsupported_file_stops_processing_once() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let files = write_files(temp_dir.path());
    let mut rag = session(temp_dir.path(), Arc::new(EchoChat::default())).await;

    rag.add_files(&[&files[2], &files[0]]).expect("added");
    let result = rag.process_files().await;

    assert!(matches!(result, Err(RagError::UnsupportedFormat(_))));
    assert!(rag.get_processed_files().is_empty());
    assert_eq!(rag.get_failed_files(), [files[2].clone()]);
    assert_eq!(rag.state(), SessionState::Loaded);

    rag.process_files().await.expect("csv is skipped");
    assert_eq!(rag.get_processed_files(), [files[0].clone()]);
    assert_eq!(rag.state(), SessionState::Ready);
    assert!(rag.query("What is Rust?").await.is_ok());
}

#[test]
fn collect_single_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let files = write_files(temp_dir.path());

    let collected = collect_documents(&files[2]).expect("collected");
    assert_eq!(collected, [files[2].clone()]);
}
