//! askdb-text
//!
//! Tantivy-backed lexical signal: a BM25 index over chunk texts keyed by
//! chunk id. Built once per snapshot, opened read-only at query time.

pub mod index;
pub mod tantivy_utils;

pub use index::TantivyChunkIndex;
