use async_trait::async_trait;

use crate::types::RankedList;

/// Batch embedding provider. Build and query embeddings must come from
/// the same implementation so similarities are comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Generative text provider used for query reformulation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String>;
}

/// Lexical (BM25-family) signal over the chunk corpus.
pub trait LexicalIndexer: Send + Sync {
    /// Top `fetch_k` chunks with score > 0, descending. Empty when the
    /// query tokenizes to nothing or the index is empty.
    fn search(&self, query: &str, fetch_k: usize) -> anyhow::Result<RankedList>;
}

/// Dense signal: nearest neighbors by inner product on normalized
/// vectors.
pub trait VectorIndexer: Send + Sync {
    /// Row width of the indexed embeddings. Zero when the index is empty.
    fn dim(&self) -> usize;

    /// Top `fetch_k` chunks by similarity, descending. Candidates with a
    /// score strictly below `min_score` are dropped before truncation.
    fn search_vec(
        &self,
        query_vec: &[f32],
        fetch_k: usize,
        min_score: Option<f32>,
    ) -> anyhow::Result<RankedList>;
}
