//! Snapshot-backed retrieval.
//!
//! A retriever holds one loaded snapshot for its whole lifetime; it keeps
//! serving that snapshot even while a rebuild publishes a newer one.
//! Callers that want freshness re-open against the store (the service layer
//! does this whenever the published version changes).

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::embedder::{Embedder, EmbedderError};
use crate::index::{IndexError, Snapshot, SnapshotState, SnapshotStore};
use crate::ingest::metadata::MetadataRecord;

#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("no index snapshot has been published yet; upload a document first")]
    IndexUnavailable,

    #[error("k must be at least 1")]
    InvalidK,

    #[error(transparent)]
    Embedder(#[from] EmbedderError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// One ranked retrieval result. Rank 1 is the most similar chunk; `distance`
/// is the raw L2 distance that produced the ordering.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    #[serde(flatten)]
    pub record: MetadataRecord,
    pub distance: f32,
}

pub struct Retriever {
    version: String,
    snapshot: Snapshot,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("version", &self.version)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Opens the currently published snapshot.
    ///
    /// Fails with [`RetrieveError::IndexUnavailable`] when no rebuild has
    /// ever succeeded — a precondition failure, not a crash.
    pub fn open(snapshots: &SnapshotStore, embedder: Arc<dyn Embedder>) -> Result<Self, RetrieveError> {
        match snapshots.load_current()? {
            SnapshotState::Missing => Err(RetrieveError::IndexUnavailable),
            SnapshotState::Present { version, snapshot } => Ok(Self {
                version,
                snapshot,
                embedder,
            }),
        }
    }

    /// The snapshot version this retriever serves.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of chunks in the loaded snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Embeds the query and returns up to `k` chunks ordered by ascending L2
    /// distance (rank 1 first).
    ///
    /// Result positions beyond the metadata bound are dropped rather than
    /// padded, so fewer than `k` hits come back when `k` exceeds the corpus.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Hit>, RetrieveError> {
        if k == 0 {
            return Err(RetrieveError::InvalidK);
        }

        let query_vector = self.embedder.embed(query).await?;
        let neighbors = self.snapshot.index().search(&query_vector, k)?;

        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                self.snapshot.metadata().get(n.position).map(|record| Hit {
                    record: record.clone(),
                    distance: n.distance,
                })
            })
            .collect())
    }
}
