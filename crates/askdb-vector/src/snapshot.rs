//! One on-disk index generation: the vector matrix blob, the chunk
//! metadata document, and the lexical subdirectory. The blob and the
//! metadata are written together and read together; a missing or
//! mismatched pair refuses to load.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use askdb_core::error::{Error, Result};
use askdb_core::types::Chunk;

use crate::flat::FlatVectorIndex;

pub const VECTORS_FILE: &str = "vectors.bin";
pub const METADATA_FILE: &str = "chunks.json";
pub const LEXICAL_DIR: &str = "lexical";

/// Per-chunk metadata as persisted; the chunk id is the position in the
/// list, so it is not stored.
#[derive(Debug, Serialize, Deserialize)]
struct ChunkRecord {
    text: String,
    source_path: String,
    sequence_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataDoc {
    chunks: Vec<ChunkRecord>,
}

/// A loaded, immutable index generation.
#[derive(Debug)]
pub struct Snapshot {
    pub vectors: FlatVectorIndex,
    pub chunks: Vec<Chunk>,
}

impl Snapshot {
    /// Read both artifacts from `dir`. Either one missing or corrupt, or
    /// a row count that disagrees with the metadata, is fatal: search
    /// must refuse to run rather than silently return nothing.
    pub fn load(dir: &Path) -> Result<Self> {
        let vectors_path = dir.join(VECTORS_FILE);
        let metadata_path = dir.join(METADATA_FILE);
        if !vectors_path.is_file() || !metadata_path.is_file() {
            return Err(Error::IndexUnavailable(format!(
                "no index snapshot at {} (run ingest first)",
                dir.display()
            )));
        }

        let blob = fs::read(&vectors_path)
            .map_err(|e| Error::IndexUnavailable(format!("{}: {e}", vectors_path.display())))?;
        let vectors: FlatVectorIndex = bincode::deserialize(&blob).map_err(|e| {
            Error::IndexUnavailable(format!("corrupt vector blob {}: {e}", vectors_path.display()))
        })?;

        let raw = fs::read_to_string(&metadata_path)
            .map_err(|e| Error::IndexUnavailable(format!("{}: {e}", metadata_path.display())))?;
        let doc: MetadataDoc = serde_json::from_str(&raw).map_err(|e| {
            Error::IndexUnavailable(format!("corrupt metadata {}: {e}", metadata_path.display()))
        })?;

        if vectors.len() != doc.chunks.len() {
            return Err(Error::IndexUnavailable(format!(
                "snapshot mismatch: {} vector rows but {} metadata chunks",
                vectors.len(),
                doc.chunks.len()
            )));
        }

        let chunks = doc
            .chunks
            .into_iter()
            .enumerate()
            .map(|(id, r)| Chunk {
                id,
                text: r.text,
                source_path: r.source_path,
                sequence_index: r.sequence_index,
            })
            .collect::<Vec<_>>();

        debug!(chunks = chunks.len(), dim = vectors.dim(), "snapshot loaded");
        Ok(Self { vectors, chunks })
    }

    /// Write both artifacts into `dir`, creating it if needed. Chunks
    /// must already be in id order.
    pub fn write(dir: &Path, vectors: &FlatVectorIndex, chunks: &[Chunk]) -> Result<()> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::Operation(format!("create {}: {e}", dir.display())))?;

        let blob = bincode::serialize(vectors)
            .map_err(|e| Error::Operation(format!("encode vector blob: {e}")))?;
        fs::write(dir.join(VECTORS_FILE), blob)
            .map_err(|e| Error::Operation(format!("write {VECTORS_FILE}: {e}")))?;

        let doc = MetadataDoc {
            chunks: chunks
                .iter()
                .map(|c| ChunkRecord {
                    text: c.text.clone(),
                    source_path: c.source_path.clone(),
                    sequence_index: c.sequence_index,
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| Error::Operation(format!("encode metadata: {e}")))?;
        fs::write(dir.join(METADATA_FILE), json)
            .map_err(|e| Error::Operation(format!("write {METADATA_FILE}: {e}")))?;

        Ok(())
    }
}

/// Atomically replace the live snapshot with a fully-written staging
/// directory. Readers that loaded the old snapshot keep their handles;
/// new loads see only the new generation.
pub fn commit_snapshot(staging: &Path, live: &Path) -> Result<()> {
    let retired = live.with_extension("old");
    if retired.exists() {
        fs::remove_dir_all(&retired)
            .map_err(|e| Error::Operation(format!("clear {}: {e}", retired.display())))?;
    }
    if live.exists() {
        fs::rename(live, &retired)
            .map_err(|e| Error::Operation(format!("retire {}: {e}", live.display())))?;
    }
    fs::rename(staging, live).map_err(|e| {
        Error::Operation(format!("swap {} -> {}: {e}", staging.display(), live.display()))
    })?;
    if retired.exists() {
        fs::remove_dir_all(&retired)
            .map_err(|e| Error::Operation(format!("discard {}: {e}", retired.display())))?;
    }
    info!(live = %live.display(), "snapshot swapped in");
    Ok(())
}
