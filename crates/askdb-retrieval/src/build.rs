//! Offline index build: documents in, committed snapshot out.
//!
//! The pipeline reads every document under the docs root, chunks and
//! embeds them in bounded batches, writes both indexes into a staging
//! directory, and only then swaps the staging directory over the live
//! one. Readers never observe a half-built snapshot.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use askdb_core::chunker::{ChunkingConfig, DocumentProcessor};
use askdb_core::error::Error;
use askdb_core::traits::Embedder;
use askdb_core::types::Chunk;
use askdb_text::TantivyChunkIndex;
use askdb_vector::{commit_snapshot, l2_normalize, FlatVectorIndex, Snapshot, LEXICAL_DIR};

/// Provider-side ceiling on texts per embedding request.
const EMBED_BATCH_SIZE: usize = 100;

/// What a finished build produced.
#[derive(Debug)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub dim: usize,
}

/// Chunk, embed and index everything under `docs_dir`, then commit the
/// new snapshot at `index_dir`, atomically replacing any previous one.
pub async fn build_index(
    docs_dir: &Path,
    index_dir: &Path,
    chunking: ChunkingConfig,
    embedder: &dyn Embedder,
) -> Result<IndexStats> {
    if !docs_dir.is_dir() {
        return Err(Error::InvalidConfig(format!(
            "docs directory not found: {}",
            docs_dir.display()
        ))
        .into());
    }
    let processor = DocumentProcessor::new(chunking);
    let chunks = processor.process_directory(docs_dir)?;
    if chunks.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "no indexable text under {}",
            docs_dir.display()
        ))
        .into());
    }
    let documents = count_documents(&chunks);
    info!(documents, chunks = chunks.len(), "chunked document collection");

    let mut embeddings = embed_corpus(embedder, &chunks).await?;
    for row in &mut embeddings {
        l2_normalize(row);
    }
    let vectors = FlatVectorIndex::from_rows(&embeddings)?;

    let staging = index_dir.with_extension("staging");
    if staging.exists() {
        std::fs::remove_dir_all(&staging)
            .with_context(|| format!("clear stale staging dir {}", staging.display()))?;
    }
    Snapshot::write(&staging, &vectors, &chunks)?;
    TantivyChunkIndex::build(&staging.join(LEXICAL_DIR), &chunks)?;
    commit_snapshot(&staging, index_dir)?;

    Ok(IndexStats { documents, chunks: chunks.len(), dim: vectors.dim() })
}

fn count_documents(chunks: &[Chunk]) -> usize {
    chunks
        .iter()
        .map(|c| c.source_path.as_str())
        .collect::<HashSet<_>>()
        .len()
}

async fn embed_corpus(embedder: &dyn Embedder, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let pb = ProgressBar::new(texts.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let rows = embedder.embed_batch(batch).await?;
        if rows.len() != batch.len() {
            bail!(
                "embedding provider returned {} vectors for {} texts",
                rows.len(),
                batch.len()
            );
        }
        embeddings.extend(rows);
        pb.set_position(embeddings.len() as u64);
    }
    pb.finish_with_message("embedded");
    Ok(embeddings)
}
