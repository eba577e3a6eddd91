//! askdb-vector
//!
//! Dense signal over chunk embeddings: an exact inner-product index
//! stored as one contiguous matrix, plus snapshot persistence. Row
//! number equals chunk id, which is what joins the matrix to the chunk
//! metadata.

pub mod flat;
pub mod snapshot;

pub use flat::{l2_normalize, FlatVectorIndex};
pub use snapshot::{commit_snapshot, Snapshot, LEXICAL_DIR, METADATA_FILE, VECTORS_FILE};
