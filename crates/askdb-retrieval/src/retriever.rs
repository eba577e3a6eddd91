//! The retrieval orchestrator.
//!
//! Composes the vector and lexical signals, rank fusion, optional query
//! expansion and optional reranking into the one externally consumed
//! operation, `search`. Every optional stage has a defined no-op or
//! fallback, so a degraded dependency lowers quality instead of failing
//! the call.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future;
use serde::Deserialize;
use tracing::{debug, warn};

use askdb_core::clean::normalize_for_embedding;
use askdb_core::traits::{Embedder, LexicalIndexer, VectorIndexer};
use askdb_core::types::{Chunk, ChunkId, Passage, RankedList};
use askdb_vector::l2_normalize;

use crate::expand::{ExpansionConfig, QueryExpander};
use crate::fusion::{rrf_merge, rrf_merge_ranks};
use crate::rerank::{RerankConfig, Reranker};

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.45
}

fn default_hybrid_fetch_k() -> usize {
    30
}

fn default_rrf_k() -> f32 {
    crate::fusion::DEFAULT_RRF_K
}

/// Pipeline configuration. Each optional stage is an explicit toggle
/// with its own parameters, resolved once at startup rather than read
/// from ambient state per call.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Similarity floor for vector-only search; `<= 0` disables the
    /// filter. Hybrid and expansion paths ignore it: fused reciprocal-
    /// rank scores are not on the cosine scale.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default)]
    pub hybrid_enabled: bool,
    /// Per-signal candidate pool when hybrid search is on.
    #[serde(default = "default_hybrid_fetch_k")]
    pub hybrid_fetch_k: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
            hybrid_enabled: false,
            hybrid_fetch_k: default_hybrid_fetch_k(),
            rrf_k: default_rrf_k(),
            expansion: ExpansionConfig::default(),
            rerank: RerankConfig::default(),
        }
    }
}

/// Read-only retrieval engine over a loaded snapshot. Shared freely
/// across concurrent searches; nothing here is mutated after
/// construction.
pub struct Retriever<V, L>
where
    V: VectorIndexer,
    L: LexicalIndexer,
{
    vectors: V,
    lexical: Option<L>,
    chunks: Vec<Chunk>,
    embedder: Arc<dyn Embedder>,
    expander: Option<QueryExpander>,
    reranker: Reranker,
    config: RetrievalConfig,
}

impl<V, L> Retriever<V, L>
where
    V: VectorIndexer,
    L: LexicalIndexer,
{
    /// Wire a retriever over loaded indexes. `lexical` is the optional
    /// second signal; `expander` is present only when expansion is both
    /// enabled and has a provider to call.
    pub fn new(
        vectors: V,
        lexical: Option<L>,
        chunks: Vec<Chunk>,
        embedder: Arc<dyn Embedder>,
        expander: Option<QueryExpander>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        if vectors.dim() != 0 && vectors.dim() != embedder.dim() {
            return Err(anyhow!(
                "index was built with {}-wide embeddings but the embedder produces {} (rebuild the index)",
                vectors.dim(),
                embedder.dim()
            ));
        }
        let reranker = Reranker::new(config.rerank.clone())?;
        Ok(Self { vectors, lexical, chunks, embedder, expander, reranker, config })
    }

    /// The public retrieval operation: ranked passages for a query.
    ///
    /// `top_k` and `min_score` override the configured defaults for this
    /// call only. An empty result is an answer ("nothing relevant"), not
    /// a failure; errors are reserved for structural problems with the
    /// loaded index.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        min_score: Option<f32>,
    ) -> Result<Vec<Passage>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let k = top_k.unwrap_or(self.config.top_k);
        if k == 0 {
            return Ok(Vec::new());
        }
        let threshold = min_score.unwrap_or(self.config.min_score);
        let fetch_k = if self.hybrid_active() {
            self.config.hybrid_fetch_k.min(self.chunks.len())
        } else {
            k.saturating_mul(3).min(self.chunks.len())
        };

        let ranking: Vec<(ChunkId, f32)> = if let Some(expander) = &self.expander {
            let variants = expander.expand(query, self.config.expansion.num_variants).await;
            debug!(variants = variants.len(), "retrieving per query variant");
            // Fan out one pass per variant; thresholds are meaningless
            // across fused scores, so none is applied.
            let passes = variants.iter().map(|v| self.retrieve_pass(v, fetch_k, None));
            let orders: Vec<Vec<ChunkId>> = future::join_all(passes)
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .map(|pass| pass.into_iter().map(|(id, _)| id).collect())
                .collect();
            if orders.iter().all(Vec::is_empty) {
                return Ok(Vec::new());
            }
            rrf_merge_ranks(&orders, self.config.rrf_k, self.chunks.len())
                .into_iter()
                .map(|f| (f.chunk_id, f.fused_score))
                .collect()
        } else {
            let pass_threshold = (threshold > 0.0).then_some(threshold);
            self.retrieve_pass(query, fetch_k, pass_threshold).await?
        };

        let candidates = self.project(&ranking);
        if self.config.rerank.enabled {
            let n = self.config.rerank.top_n.min(candidates.len());
            let shortlist: Vec<Passage> = candidates.into_iter().take(n).collect();
            let mut reranked = self.reranker.rerank(query, shortlist, k).await;
            reranked.truncate(k);
            Ok(reranked)
        } else {
            Ok(candidates.into_iter().take(k).collect())
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    fn hybrid_active(&self) -> bool {
        self.config.hybrid_enabled && self.lexical.is_some()
    }

    /// One retrieval pass for one query string: chunk ids best first,
    /// each with the score that ranked it (cosine similarity when
    /// vector-only, reciprocal-rank score when both signals fused).
    async fn retrieve_pass(
        &self,
        query: &str,
        fetch_k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<(ChunkId, f32)>> {
        if !self.hybrid_active() {
            let vector_list = self.vector_candidates(query, fetch_k, min_score).await?;
            return Ok(scores_of(vector_list));
        }

        // Hybrid: both signals at full width, no similarity floor.
        let vector_list = self.vector_candidates(query, fetch_k, None).await?;
        let lexical_list = self.lexical_candidates(query, fetch_k);
        if vector_list.is_empty() && lexical_list.is_empty() {
            return Ok(Vec::new());
        }
        // A signal that came back empty falls out of the fusion instead
        // of dragging the other one down.
        if vector_list.is_empty() {
            return Ok(scores_of(lexical_list));
        }
        if lexical_list.is_empty() {
            return Ok(scores_of(vector_list));
        }
        let fused = rrf_merge(&[vector_list, lexical_list], self.config.rrf_k, self.chunks.len());
        Ok(fused.into_iter().map(|f| (f.chunk_id, f.fused_score)).collect())
    }

    /// Dense leg of a pass. A provider failure is logged and yields an
    /// empty list (the signal is unavailable, the search goes on);
    /// errors from the index itself are structural and propagate.
    async fn vector_candidates(
        &self,
        query: &str,
        fetch_k: usize,
        min_score: Option<f32>,
    ) -> Result<RankedList> {
        let normalized = normalize_for_embedding(query);
        let mut query_vec = match self.embedder.embed_batch(&[normalized]).await {
            Ok(mut rows) if !rows.is_empty() => rows.remove(0),
            Ok(_) => {
                warn!("embedding provider returned no vector for the query");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!("query embedding failed, vector signal unavailable: {e:#}");
                return Ok(Vec::new());
            }
        };
        l2_normalize(&mut query_vec);
        self.vectors.search_vec(&query_vec, fetch_k, min_score)
    }

    /// Lexical leg of a pass. Errors are logged and treated as "signal
    /// unavailable".
    fn lexical_candidates(&self, query: &str, fetch_k: usize) -> RankedList {
        let Some(lexical) = &self.lexical else {
            return Vec::new();
        };
        match lexical.search(query, fetch_k) {
            Ok(list) => list,
            Err(e) => {
                warn!("lexical search failed, continuing without it: {e:#}");
                Vec::new()
            }
        }
    }

    fn project(&self, ranking: &[(ChunkId, f32)]) -> Vec<Passage> {
        ranking
            .iter()
            .filter_map(|&(chunk_id, score)| {
                self.chunks.get(chunk_id).map(|chunk| Passage {
                    text: chunk.text.clone(),
                    source_path: chunk.source_path.clone(),
                    score,
                })
            })
            .collect()
    }
}

fn scores_of(list: RankedList) -> Vec<(ChunkId, f32)> {
    list.into_iter().map(|c| (c.chunk_id, c.score)).collect()
}
