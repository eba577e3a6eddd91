use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument};
use tracing::debug;

use askdb_core::traits::LexicalIndexer;
use askdb_core::types::{Candidate, RankedList, Signal};

use crate::tantivy_utils::{build_schema, register_tokenizer};

/// BM25 index over chunk texts. `build` recreates the index directory
/// from scratch; `open` attaches to one written earlier. Either way the
/// index is read-only afterwards and safe to share across queries.
pub struct TantivyChunkIndex {
    index: Index,
    chunk_id_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
}

impl TantivyChunkIndex {
    pub fn build(index_dir: &Path, chunks: &[askdb_core::types::Chunk]) -> Result<Self> {
        let schema = build_schema();
        if index_dir.exists() {
            std::fs::remove_dir_all(index_dir)?;
        }
        std::fs::create_dir_all(index_dir)?;
        let index = Index::create_in_dir(index_dir, schema.clone())?;
        register_tokenizer(&index);
        let chunk_id_field = schema.get_field("chunk_id")?;
        let text_field = schema.get_field("text")?;

        let mut writer = index.writer(50_000_000)?;
        for chunk in chunks {
            writer.add_document(doc!(
                chunk_id_field => chunk.id as u64,
                text_field => chunk.text.clone(),
            ))?;
        }
        writer.commit()?;
        debug!(chunks = chunks.len(), dir = %index_dir.display(), "lexical index built");

        Ok(Self { index, chunk_id_field, text_field })
    }

    pub fn open(index_dir: &Path) -> Result<Self> {
        let index = Index::open_in_dir(index_dir)?;
        register_tokenizer(&index);
        let schema = index.schema();
        let chunk_id_field = schema.get_field("chunk_id")?;
        let text_field = schema.get_field("text")?;
        Ok(Self { index, chunk_id_field, text_field })
    }
}

impl LexicalIndexer for TantivyChunkIndex {
    fn search(&self, query: &str, fetch_k: usize) -> Result<RankedList> {
        if fetch_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let reader = self.index.reader()?;
        let searcher = reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        // Queries are natural language; syntax that fails to parse is
        // dropped rather than surfaced as an error.
        let (parsed, _errors) = parser.parse_query_lenient(query);
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(fetch_k))?;

        let mut hits: RankedList = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            if score <= 0.0 {
                continue;
            }
            let stored: TantivyDocument = searcher.doc(addr)?;
            let Some(chunk_id) = stored.get_first(self.chunk_id_field).and_then(|v| v.as_u64())
            else {
                continue;
            };
            hits.push(Candidate {
                chunk_id: chunk_id as usize,
                score,
                signal: Signal::Lexical,
            });
        }
        Ok(hits)
    }
}
