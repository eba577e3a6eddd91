use anyhow::Result;
use serde::{Deserialize, Serialize};

use askdb_core::traits::VectorIndexer;
use askdb_core::types::{Candidate, RankedList, Signal};

/// Exact nearest-neighbor index: a row-major `rows x dim` matrix scored
/// by dot product. Embeddings are L2-normalized before insertion, so the
/// dot product is cosine similarity in `[-1, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatVectorIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatVectorIndex {
    /// Build from one embedding row per chunk, in chunk-id order. All
    /// rows must share the same dimension.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self { dim: 0, data: Vec::new() });
        };
        let dim = first.len();
        if dim == 0 {
            anyhow::bail!("embedding rows must not be zero-dimensional");
        }
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                anyhow::bail!(
                    "embedding dimension mismatch at row {i}: expected {dim}, got {}",
                    row.len()
                );
            }
            data.extend_from_slice(row);
        }
        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows (= chunks).
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }
}

impl VectorIndexer for FlatVectorIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn search_vec(
        &self,
        query_vec: &[f32],
        fetch_k: usize,
        min_score: Option<f32>,
    ) -> Result<RankedList> {
        if self.is_empty() || fetch_k == 0 {
            return Ok(Vec::new());
        }
        if query_vec.len() != self.dim {
            anyhow::bail!(
                "query embedding dimension mismatch: expected {}, got {}",
                self.dim,
                query_vec.len()
            );
        }

        let mut scored: Vec<Candidate> = (0..self.len())
            .map(|chunk_id| Candidate {
                chunk_id,
                score: dot(self.row(chunk_id), query_vec),
                signal: Signal::Vector,
            })
            .filter(|c| min_score.map_or(true, |t| c.score >= t))
            .collect();
        // Stable sort keeps ascending chunk id within equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(fetch_k);
        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale `v` to unit length in place. Zero vectors are left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: Vec<f32>) -> Vec<f32> {
        let mut v = v;
        l2_normalize(&mut v);
        v
    }

    #[test]
    fn identical_embedding_is_top_hit_with_unit_score() {
        let rows = vec![
            unit(vec![1.0, 0.0, 0.0]),
            unit(vec![0.6, 0.8, 0.0]),
            unit(vec![0.0, 0.0, 1.0]),
        ];
        let index = FlatVectorIndex::from_rows(&rows).expect("build");

        let hits = index.search_vec(&rows[1], 3, None).expect("search");
        assert_eq!(hits[0].chunk_id, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-5, "cosine self-similarity");
        assert_eq!(hits[0].signal, Signal::Vector);
    }

    #[test]
    fn results_descend_and_truncate_to_fetch_k() {
        let rows = vec![
            unit(vec![1.0, 0.0]),
            unit(vec![0.9, 0.1]),
            unit(vec![0.0, 1.0]),
        ];
        let index = FlatVectorIndex::from_rows(&rows).expect("build");

        let hits = index.search_vec(&rows[0], 2, None).expect("search");
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].chunk_id, 0);
        assert_eq!(hits[1].chunk_id, 1);
    }

    #[test]
    fn min_score_filters_before_truncation() {
        let rows = vec![unit(vec![1.0, 0.0]), unit(vec![0.0, 1.0])];
        let index = FlatVectorIndex::from_rows(&rows).expect("build");

        let hits = index.search_vec(&rows[0], 10, Some(0.5)).expect("search");
        assert_eq!(hits.len(), 1, "orthogonal row scores 0.0 and is dropped");
        assert_eq!(hits[0].chunk_id, 0);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let index = FlatVectorIndex::from_rows(&[vec![1.0, 0.0]]).expect("build");
        assert!(index.search_vec(&[1.0, 0.0, 0.0], 1, None).is_err());

        assert!(FlatVectorIndex::from_rows(&[vec![1.0, 0.0], vec![1.0]]).is_err());
    }

    #[test]
    fn empty_index_returns_empty() {
        let index = FlatVectorIndex::from_rows(&[]).expect("build");
        assert_eq!(index.len(), 0);
        assert!(index.search_vec(&[1.0], 5, None).expect("search").is_empty());
    }

    #[test]
    fn normalize_handles_zero_vector() {
        let mut v = vec![0.0f32, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);

        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }
}
