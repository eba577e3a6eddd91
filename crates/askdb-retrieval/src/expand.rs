//! Multi-query expansion: alternate phrasings of one query widen recall
//! before fusion.

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use askdb_core::traits::TextGenerator;

const EXPAND_SYSTEM: &str = "You rewrite search queries. Output only reformulations of the \
question, one per line, without numbering or commentary. Preserve the meaning and the \
language of the question.";

/// Drop a leading `- `, `* ` or `1.` / `1)` list marker. The prompt asks
/// for bare lines, but chatty models number them anyway.
fn strip_list_marker(line: &str) -> &str {
    let rest = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(tail) = rest[digits..].strip_prefix(['.', ')']) {
            return tail.trim_start();
        }
    }
    rest
}

fn default_num_variants() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Total variant count, the original query included.
    #[serde(default = "default_num_variants")]
    pub num_variants: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self { enabled: false, num_variants: default_num_variants() }
    }
}

/// Reformulates queries through the generative provider.
pub struct QueryExpander {
    generator: Arc<dyn TextGenerator>,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Return up to `num_variants` query strings, the original first.
    ///
    /// Provider output is parsed one variant per line, trimmed, stripped
    /// of list markers, and deduplicated against the original and each
    /// other (exact match). A failed or empty provider call degrades to
    /// the original alone; expansion must never break retrieval.
    pub async fn expand(&self, query: &str, num_variants: usize) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() || num_variants <= 1 {
            return vec![query.to_string()];
        }
        let extra = num_variants - 1;
        let prompt = format!(
            "Rephrase the following question in {extra} different ways (different wording, \
same meaning). Each reformulation on its own line.\n\nQuestion: {query}\n\n\
Reformulations (one per line):"
        );
        let text = match self.generator.complete(EXPAND_SYSTEM, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("query expansion failed, searching with the original query only: {e:#}");
                return vec![query.to_string()];
            }
        };
        let mut variants = vec![query.to_string()];
        for line in text
            .lines()
            .map(|l| strip_list_marker(l.trim()))
            .filter(|l| !l.is_empty())
            .take(extra)
        {
            if !variants.iter().any(|v| v == line) {
                variants.push(line.to_string());
            }
        }
        variants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct FixedGenerator {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self { reply, calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn original_comes_first_followed_by_reformulations() {
        let generator = FixedGenerator::new("how do I plan a marketing budget\nbudget planning for marketing");
        let expander = QueryExpander::new(generator);
        let variants = expander.expand("marketing budget", 3).await;
        assert_eq!(
            variants,
            vec![
                "marketing budget".to_string(),
                "how do I plan a marketing budget".to_string(),
                "budget planning for marketing".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn blank_lines_are_dropped_and_output_is_capped() {
        let generator = FixedGenerator::new("a\n\n  b  \nc\nd");
        let expander = QueryExpander::new(generator);
        let variants = expander.expand("q", 3).await;
        assert_eq!(variants, vec!["q".to_string(), "a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn list_markers_are_stripped_before_dedup() {
        let generator = FixedGenerator::new("1. spend plan\n- spend plan\n* channel mix");
        let expander = QueryExpander::new(generator);
        let variants = expander.expand("marketing budget", 4).await;
        assert_eq!(
            variants,
            vec![
                "marketing budget".to_string(),
                "spend plan".to_string(),
                "channel mix".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn duplicates_of_the_original_are_dropped() {
        let generator = FixedGenerator::new("marketing budget\nspend plan");
        let expander = QueryExpander::new(generator);
        let variants = expander.expand("marketing budget", 3).await;
        assert_eq!(variants, vec!["marketing budget".to_string(), "spend plan".to_string()]);
    }

    #[tokio::test]
    async fn single_variant_skips_the_provider() {
        let generator = FixedGenerator::new("unused");
        let expander = QueryExpander::new(generator.clone());
        let variants = expander.expand("marketing budget", 1).await;
        assert_eq!(variants, vec!["marketing budget".to_string()]);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_the_original() {
        let expander = QueryExpander::new(Arc::new(FailingGenerator));
        let variants = expander.expand("marketing budget", 3).await;
        assert_eq!(variants, vec!["marketing budget".to_string()]);
    }

    #[tokio::test]
    async fn empty_query_is_returned_as_is() {
        let expander = QueryExpander::new(Arc::new(FailingGenerator));
        assert_eq!(expander.expand("   ", 3).await, vec![String::new()]);
    }
}
