//! Precision reranking of a fused shortlist.
//!
//! A remote scoring endpoint re-scores (query, passage) pairs when
//! configured; otherwise a term-overlap heuristic refines the order
//! locally. Either way the stage is a quality enhancement: any failure
//! keeps the incoming order instead of failing the search.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use askdb_core::types::Passage;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn default_top_n() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Shortlist ceiling: at most this many candidates are re-scored.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Remote scoring endpoint; empty means score locally.
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_n: default_top_n(),
            api_url: String::new(),
            api_key: String::new(),
        }
    }
}

/// Re-scores a shortlist of passages against the query.
pub struct Reranker {
    config: RerankConfig,
    client: Option<Client>,
}

impl Reranker {
    pub fn new(config: RerankConfig) -> Result<Self> {
        let client = if config.api_url.is_empty() {
            None
        } else {
            Some(
                Client::builder()
                    .timeout(REQUEST_TIMEOUT)
                    .build()
                    .context("build rerank client")?,
            )
        };
        Ok(Self { config, client })
    }

    /// Return the `top_k` most relevant of `candidates`, best first, with
    /// the relevance score replacing the prior score.
    ///
    /// When nothing would be cut and no remote scorer is configured the
    /// input passes through untouched. A failed or malformed remote call
    /// falls back to the first `top_k` candidates in their prior order.
    pub async fn rerank(&self, query: &str, candidates: Vec<Passage>, top_k: usize) -> Vec<Passage> {
        if candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() <= top_k && self.client.is_none() {
            return candidates;
        }
        match &self.client {
            Some(client) => match self.rerank_remote(client, query, &candidates, top_k).await {
                Ok(ranked) if !ranked.is_empty() => ranked,
                Ok(_) => {
                    debug!("rerank endpoint returned no usable entries, keeping prior order");
                    head(candidates, top_k)
                }
                Err(e) => {
                    warn!("rerank call failed, keeping prior order: {e:#}");
                    head(candidates, top_k)
                }
            },
            None => rerank_local(query, candidates, top_k),
        }
    }

    async fn rerank_remote(
        &self,
        client: &Client,
        query: &str,
        candidates: &[Passage],
        top_k: usize,
    ) -> Result<Vec<Passage>> {
        let request = RerankRequest {
            query,
            documents: candidates.iter().map(|c| c.text.as_str()).collect(),
        };
        let mut call = client.post(&self.config.api_url).json(&request);
        if !self.config.api_key.is_empty() {
            call = call.bearer_auth(&self.config.api_key);
        }
        let response = call
            .send()
            .await
            .with_context(|| format!("rerank request to {}", self.config.api_url))?;
        if !response.status().is_success() {
            return Err(anyhow!("rerank endpoint returned {}", response.status()));
        }
        let parsed: RerankResponse = response.json().await.context("decode rerank response")?;
        let entries = if parsed.results.is_empty() { parsed.data } else { parsed.results };

        let mut scored: Vec<(usize, f32)> = entries
            .into_iter()
            .filter_map(|e| {
                let index = usize::try_from(e.index?).ok()?;
                Some((index, e.relevance_score.or(e.score).unwrap_or(0.0)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen = HashSet::new();
        let mut ranked = Vec::new();
        for (index, score) in scored {
            // Out-of-range and duplicate indices are the endpoint's
            // problem, not ours; skip them.
            if index >= candidates.len() || !seen.insert(index) {
                continue;
            }
            let mut passage = candidates[index].clone();
            passage.score = score;
            ranked.push(passage);
            if ranked.len() >= top_k {
                break;
            }
        }
        Ok(ranked)
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: Vec<&'a str>,
}

/// Accepts the two common response shapes: entries under `results` or
/// `data`, scored as `relevance_score` or `score`.
#[derive(Deserialize)]
struct RerankResponse {
    #[serde(default)]
    results: Vec<RerankEntry>,
    #[serde(default)]
    data: Vec<RerankEntry>,
}

#[derive(Deserialize)]
struct RerankEntry {
    index: Option<i64>,
    relevance_score: Option<f32>,
    score: Option<f32>,
}

fn head(mut candidates: Vec<Passage>, top_k: usize) -> Vec<Passage> {
    candidates.truncate(top_k);
    candidates
}

/// Term-overlap scoring: blend the prior score with the fraction of
/// query terms the passage contains, then cut to `top_k`.
fn rerank_local(query: &str, mut candidates: Vec<Passage>, top_k: usize) -> Vec<Passage> {
    let query_lower = query.to_lowercase();
    let terms: HashSet<&str> = query_lower.split_whitespace().collect();
    if !terms.is_empty() {
        for passage in &mut candidates {
            let text_lower = passage.text.to_lowercase();
            let overlap = terms.iter().filter(|t| text_lower.contains(**t)).count();
            let boost = overlap as f32 / terms.len() as f32;
            passage.score = passage.score * 0.7 + boost * 0.3;
        }
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    }
    candidates.truncate(top_k);
    candidates
}
