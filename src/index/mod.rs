//! Vector index construction and snapshot persistence.
//!
//! A published snapshot is three co-located artifacts — serialized index,
//! serialized vector list, serialized metadata list — that load together and
//! are never individually substituted. Position `i` in all three refers to
//! the same chunk; that alignment is the central correctness property of the
//! whole core.

pub mod builder;
pub mod flat;
pub mod snapshot;

pub use builder::{IndexBuilder, RebuildReport};
pub use flat::{FlatIndex, Neighbor};
pub use snapshot::{Snapshot, SnapshotState, SnapshotStore};

use thiserror::Error;

use crate::embedder::EmbedderError;

/// Errors raised while building, persisting, or loading an index snapshot.
///
/// Structural conditions (`EmptyCorpus`, `AlignmentViolation`) abort a
/// rebuild outright; the previously published snapshot stays in place.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("corpus produced no usable chunks; refusing to publish an empty index")]
    EmptyCorpus,

    #[error(
        "snapshot alignment violated: {vectors} vectors, {metadata} metadata records, {index} index entries"
    )]
    AlignmentViolation {
        vectors: usize,
        metadata: usize,
        index: usize,
    },

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("snapshot data corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Embedder(#[from] EmbedderError),

    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corpus store: {0}")]
    Store(String),
}
