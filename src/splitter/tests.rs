use super::*;

fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
    TextSplitter::new(&ChunkingConfig {
        chunk_size,
        chunk_overlap,
    })
    .expect("valid chunking config")
}

fn numbered_words(count: usize) -> String {
    (0..count)
        .map(|i| format!("w{:03}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn default_config_values() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 1000);
    assert_eq!(config.chunk_overlap, 200);
}

#[test]
fn splits_on_paragraphs_first() {
    let chunks = splitter(5, 0).split_text("aaaa\n\nbbbb");
    assert_eq!(chunks, vec!["aaaa", "bbbb"]);
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = splitter(1000, 200).split_text("A short paragraph.\nWith two lines.");
    assert_eq!(chunks, vec!["A short paragraph.\nWith two lines."]);
}

#[test]
fn empty_text_yields_no_chunks() {
    assert!(splitter(100, 10).split_text("").is_empty());
    assert!(splitter(100, 10).split_text("  \n\n ").is_empty());
}

#[test]
fn chunks_never_exceed_chunk_size() {
    let text = format!(
        "{}\n\n{}\n{}",
        numbered_words(120),
        numbered_words(40),
        "x".repeat(250)
    );
    let chunks = splitter(100, 20).split_text(&text);

    assert!(chunks.len() > 3);
    for chunk in &chunks {
        assert!(
            chunk.chars().count() <= 100,
            "chunk too long ({}): {chunk}",
            chunk.chars().count()
        );
    }
}

#[test]
fn consecutive_chunks_overlap_by_at_most_chunk_overlap() {
    let text = numbered_words(200);
    let chunks = splitter(100, 20).split_text(&text);
    assert!(chunks.len() > 2);

    for pair in chunks.windows(2) {
        let previous: Vec<&str> = pair[0].split(' ').collect();
        let next: Vec<&str> = pair[1].split(' ').collect();

        // Words are unique, so the shared words form a suffix/prefix
        let shared: Vec<&str> = next
            .iter()
            .copied()
            .take_while(|word| previous.contains(word))
            .collect();
        assert!(!shared.is_empty(), "expected overlap between chunks");

        let shared_len = shared.join(" ").chars().count();
        assert!(shared_len <= 20, "overlap of {shared_len} chars");
        assert!(pair[0].ends_with(&shared.join(" ")));
    }
}

#[test]
fn chunks_cover_every_word_in_order() {
    let text = numbered_words(150);
    let chunks = splitter(60, 0).split_text(&text);

    let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
    let original: Vec<&str> = text.split(' ').collect();
    assert_eq!(rejoined, original);
}

#[test]
fn overlong_word_falls_back_to_characters() {
    let chunks = splitter(10, 0).split_text(&"z".repeat(25));
    assert_eq!(chunks, vec!["z".repeat(10), "z".repeat(10), "z".repeat(5)]);
}

#[test]
fn counts_characters_not_bytes() {
    let text = "é".repeat(30);
    let chunks = splitter(10, 0).split_text(&text);
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() == 10));
}

#[test]
fn overlap_larger_than_size_is_rejected() {
    let result = TextSplitter::new(&ChunkingConfig {
        chunk_size: 100,
        chunk_overlap: 101,
    });
    assert!(matches!(result, Err(RagError::Config(_))));
}

#[test]
fn zero_chunk_size_is_rejected() {
    let result = TextSplitter::new(&ChunkingConfig {
        chunk_size: 0,
        chunk_overlap: 0,
    });
    assert!(matches!(result, Err(RagError::Config(_))));
}

#[test]
fn overlap_equal_to_size_is_allowed() {
    assert!(
        TextSplitter::new(&ChunkingConfig {
            chunk_size: 50,
            chunk_overlap: 50,
        })
        .is_ok()
    );
}

#[test]
fn custom_separators() {
    let chunks = splitter(8, 0)
        .with_separators(["|", ""])
        .split_text("abc|def|ghijk");
    assert_eq!(chunks, vec!["abc|def", "|ghijk"]);
}

#[test]
fn split_documents_preserves_metadata() {
    let documents = vec![
        Document::new(numbered_words(60), "first.pdf").with_page(3),
        Document::new("tiny", "second.txt"),
    ];

    let chunks = splitter(100, 20).split_documents(&documents);
    assert!(chunks.len() > 2);

    let (first, second): (Vec<_>, Vec<_>) = chunks
        .iter()
        .partition(|c| c.metadata.source == "first.pdf");
    assert!(first.iter().all(|c| c.metadata.page == Some(3)));
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].page_content, "tiny");
    assert_eq!(second[0].metadata.page, None);

    let indices: Vec<Option<u32>> = chunks.iter().map(|c| c.metadata.chunk_index).collect();
    let expected: Vec<Option<u32>> = (0..chunks.len())
        .map(|i| u32::try_from(i).ok())
        .collect();
    assert_eq!(indices, expected);
}
