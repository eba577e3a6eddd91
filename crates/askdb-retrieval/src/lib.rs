//! The retrieval pipeline: rank fusion, query expansion, reranking, and
//! the orchestrator composing both signals into the public `search`
//! operation. Also hosts the offline index-build pipeline.

pub mod build;
pub mod expand;
pub mod fusion;
pub mod rerank;
pub mod retriever;

pub use build::{build_index, IndexStats};
pub use expand::{ExpansionConfig, QueryExpander};
pub use fusion::{rrf_merge, rrf_merge_ranks, DEFAULT_RRF_K};
pub use rerank::{RerankConfig, Reranker};
pub use retriever::{RetrievalConfig, Retriever};
