//! Domain types shared by the lexical and vector signals and the retriever.

use serde::{Deserialize, Serialize};

/// Dense, zero-based chunk identifier.
///
/// Assigned at index-build time in document-then-chunk order. It is the
/// sole join key between the vector index (row number), the lexical index
/// (stored field) and the metadata list (position).
pub type ChunkId = usize;

/// A bounded slice of one source document, the atomic unit of retrieval.
///
/// - `id`: dense corpus-wide identifier
/// - `text`: the cleaned text payload
/// - `source_path`: path of the source file, relative to the docs root
/// - `sequence_index`: position of this chunk within its document
///
/// Chunks are created once by the index builder and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source_path: String,
    pub sequence_index: usize,
}

/// Indicates which signal produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Vector,
    Lexical,
}

/// A scored chunk reference produced by one signal for one query.
///
/// `score` is signal-specific (cosine similarity or BM25); higher is
/// always better. Candidates never outlive a single search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub signal: Signal,
}

/// An ordered candidate list, best first, as returned by one signal for
/// one query variant. Consumed only by rank fusion.
pub type RankedList = Vec<Candidate>;

/// One entry of a fused ranking: the accumulated reciprocal-rank score
/// for a chunk across all input lists.
#[derive(Debug, Clone)]
pub struct FusedResult {
    pub chunk_id: ChunkId,
    pub fused_score: f32,
}

/// The public result unit: a chunk's text and origin plus its final
/// score. Chunk ids stay internal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source_path: String,
    pub score: f32,
}
