//! Embedding and text-generation providers.
//!
//! `HttpEmbedder` and `HttpGenerator` speak the OpenAI-compatible wire
//! format against any configured endpoint. `HashEmbedder` is a
//! deterministic offline stand-in so indexing and retrieval can be
//! exercised without credentials or network.

use std::sync::Arc;

use anyhow::Result;

use askdb_core::config::Config;
use askdb_core::traits::Embedder;

pub mod fake;
pub mod provider;

pub use fake::HashEmbedder;
pub use provider::{EmbeddingProviderConfig, GenerationProviderConfig, HttpEmbedder, HttpGenerator};

/// Embedding width of the offline hash embedder.
pub const FAKE_EMBEDDING_DIM: usize = 1024;

/// True when `APP_USE_FAKE_EMBEDDINGS` asks for the offline embedder.
pub fn fake_embeddings_enabled() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the embedder the rest of the system talks to.
///
/// Set `APP_USE_FAKE_EMBEDDINGS=1` to swap in the deterministic hash
/// embedder, which needs no network or credentials. Otherwise the
/// `providers.embedding` section must carry a usable endpoint and key.
pub fn default_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    if fake_embeddings_enabled() {
        tracing::info!("APP_USE_FAKE_EMBEDDINGS is set, using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    let provider: EmbeddingProviderConfig = config.get("providers.embedding")?;
    Ok(Arc::new(HttpEmbedder::new(&provider)?))
}
