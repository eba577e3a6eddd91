//! Reciprocal Rank Fusion over ranked candidate lists.

use std::collections::HashMap;

use askdb_core::types::{ChunkId, FusedResult, RankedList};

/// Standard RRF discount constant. Larger values flatten the influence
/// of rank position; smaller ones let top ranks dominate.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Fuse per-signal candidate lists into one consensus ranking.
///
/// Each entry at 1-based rank `r` contributes `1 / (k + r)` to its
/// chunk's accumulated score; a chunk in several lists sums its
/// contributions. This reconciles signals whose raw scores live on
/// incomparable scales without normalizing anything.
pub fn rrf_merge(lists: &[RankedList], k: f32, corpus_size: usize) -> Vec<FusedResult> {
    let orders: Vec<Vec<ChunkId>> = lists
        .iter()
        .map(|list| list.iter().map(|c| c.chunk_id).collect())
        .collect();
    rrf_merge_ranks(&orders, k, corpus_size)
}

/// Rank-only fusion core. Input scores never participate, only order
/// does, so rankings of any provenance (signal lists, per-variant fused
/// lists) merge uniformly. Ids at or beyond `corpus_size` are ignored.
pub fn rrf_merge_ranks(orders: &[Vec<ChunkId>], k: f32, corpus_size: usize) -> Vec<FusedResult> {
    let mut scores: HashMap<ChunkId, f32> = HashMap::new();
    for order in orders {
        for (i, &chunk_id) in order.iter().enumerate() {
            if chunk_id >= corpus_size {
                continue;
            }
            let rank = (i + 1) as f32;
            *scores.entry(chunk_id).or_insert(0.0) += 1.0 / (k + rank);
        }
    }
    let mut fused: Vec<FusedResult> = scores
        .into_iter()
        .map(|(chunk_id, fused_score)| FusedResult { chunk_id, fused_score })
        .collect();
    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk_id.cmp(&b.chunk_id))
    });
    fused
}
