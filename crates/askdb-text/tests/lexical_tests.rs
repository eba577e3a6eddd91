use tempfile::TempDir;

use askdb_core::traits::LexicalIndexer;
use askdb_core::types::{Chunk, Signal};
use askdb_text::TantivyChunkIndex;

fn corpus() -> Vec<Chunk> {
    let texts = [
        "marketing budget tips for small teams",
        "hiring engineers is slow and expensive",
        "marketing channels for startups",
    ];
    texts
        .iter()
        .enumerate()
        .map(|(id, text)| Chunk {
            id,
            text: (*text).to_string(),
            source_path: format!("doc{id}.md"),
            sequence_index: 0,
        })
        .collect()
}

#[test]
fn unique_term_returns_its_chunk_with_positive_score() {
    let tmp = TempDir::new().unwrap();
    let index = TantivyChunkIndex::build(tmp.path(), &corpus()).expect("build");

    let hits = index.search("hiring", 10).expect("search");
    assert_eq!(hits.len(), 1, "term appears in exactly one chunk");
    assert_eq!(hits[0].chunk_id, 1);
    assert!(hits[0].score > 0.0);
    assert_eq!(hits[0].signal, Signal::Lexical);
}

#[test]
fn no_term_overlap_returns_empty() {
    let tmp = TempDir::new().unwrap();
    let index = TantivyChunkIndex::build(tmp.path(), &corpus()).expect("build");

    let hits = index.search("quantum entanglement", 10).expect("search");
    assert!(hits.is_empty());
}

#[test]
fn empty_query_returns_empty() {
    let tmp = TempDir::new().unwrap();
    let index = TantivyChunkIndex::build(tmp.path(), &corpus()).expect("build");

    assert!(index.search("", 10).expect("search").is_empty());
    assert!(index.search("   ", 10).expect("search").is_empty());
}

#[test]
fn results_are_descending_and_truncated() {
    let tmp = TempDir::new().unwrap();
    let index = TantivyChunkIndex::build(tmp.path(), &corpus()).expect("build");

    let hits = index.search("marketing budget", 10).expect("search");
    assert!(hits.len() >= 2, "both marketing chunks should match");
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // chunk 0 matches both terms, chunk 2 only one
    assert_eq!(hits[0].chunk_id, 0);

    let truncated = index.search("marketing budget", 1).expect("search");
    assert_eq!(truncated.len(), 1);
}

#[test]
fn query_casing_does_not_matter() {
    let tmp = TempDir::new().unwrap();
    let index = TantivyChunkIndex::build(tmp.path(), &corpus()).expect("build");

    let hits = index.search("MARKETING", 10).expect("search");
    assert_eq!(hits.len(), 2);
}

#[test]
fn query_syntax_noise_is_tolerated() {
    let tmp = TempDir::new().unwrap();
    let index = TantivyChunkIndex::build(tmp.path(), &corpus()).expect("build");

    // unbalanced quotes and operators must not error on natural input
    let hits = index.search("\"marketing AND (", 10).expect("search");
    assert!(hits.len() <= 3);
}

#[test]
fn open_reads_a_persisted_index() {
    let tmp = TempDir::new().unwrap();
    {
        TantivyChunkIndex::build(tmp.path(), &corpus()).expect("build");
    }
    let reopened = TantivyChunkIndex::open(tmp.path()).expect("open");
    let hits = reopened.search("startups", 10).expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk_id, 2);
}

#[test]
fn open_missing_directory_fails() {
    let tmp = TempDir::new().unwrap();
    assert!(TantivyChunkIndex::open(&tmp.path().join("absent")).is_err());
}
