//! Full-corpus rebuild.
//!
//! Every rebuild starts from scratch: all stored chunk sets are collected in
//! stable order, embedded in one batch, and published as a fresh snapshot.
//! There is no incremental path — rebuild cost is O(total corpus chunks) per
//! upload, a documented scalability ceiling of this design.

use tracing::{info, warn};

use super::flat::FlatIndex;
use super::snapshot::{Snapshot, SnapshotStore};
use super::IndexError;
use crate::embedder::Embedder;
use crate::ingest::metadata::{self, MetadataRecord, ProvenanceMismatch};
use crate::store::CorpusStore;

/// Summary of one rebuild pass.
#[derive(Debug)]
pub struct RebuildReport {
    /// Name of the newly published snapshot version.
    pub version: String,
    /// Documents that contributed at least one chunk.
    pub documents: usize,
    /// Chunks embedded and indexed.
    pub chunks: usize,
    /// Documents skipped from this pass because their persisted artifacts
    /// were inconsistent.
    pub skipped: Vec<ProvenanceMismatch>,
}

pub struct IndexBuilder<'a, E: Embedder + ?Sized> {
    store: &'a CorpusStore,
    embedder: &'a E,
}

impl<'a, E: Embedder + ?Sized> IndexBuilder<'a, E> {
    pub fn new(store: &'a CorpusStore, embedder: &'a E) -> Self {
        Self { store, embedder }
    }

    /// Rebuilds the corpus snapshot from every currently stored document and
    /// publishes it through `snapshots`.
    ///
    /// Per-document provenance mismatches are reported and skipped;
    /// structural failures (`EmptyCorpus`, `AlignmentViolation`, embedding
    /// errors) abort the rebuild and leave the previous snapshot in place.
    pub async fn rebuild(&self, snapshots: &SnapshotStore) -> Result<RebuildReport, IndexError> {
        let entries = self
            .store
            .list_documents()
            .map_err(|e| IndexError::Store(e.to_string()))?;

        // Collect chunk texts and metadata together, in document-name ×
        // ordinal order, so positions agree before any vector exists.
        let mut metadata: Vec<MetadataRecord> = Vec::new();
        let mut skipped = Vec::new();
        let mut documents = 0usize;

        for entry in &entries {
            if let Err(mismatch) = metadata::check_provenance(entry) {
                warn!("Skipping document in this rebuild: {mismatch}");
                skipped.push(mismatch);
                continue;
            }

            let chunks = self
                .store
                .load_chunks(&entry.name)
                .map_err(|e| IndexError::Store(e.to_string()))?
                .unwrap_or_default();

            let records = metadata::build_records(&entry.name, &chunks);
            if !records.is_empty() {
                documents += 1;
            }
            metadata.extend(records);
        }

        if metadata.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }

        let texts: Vec<String> = metadata.iter().map(|r| r.text.clone()).collect();
        info!(
            "Embedding {} chunks from {documents} documents",
            texts.len()
        );
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != metadata.len() {
            return Err(IndexError::AlignmentViolation {
                vectors: vectors.len(),
                metadata: metadata.len(),
                index: vectors.len(),
            });
        }

        let index = FlatIndex::with_vectors(self.embedder.dimensions(), &vectors)?;
        let snapshot = Snapshot::new(index, vectors, metadata)?;
        let chunks = snapshot.len();
        let version = snapshots.publish(&snapshot)?;

        info!("Rebuild complete: snapshot {version}, {documents} documents, {chunks} chunks");
        Ok(RebuildReport {
            version,
            documents,
            chunks,
            skipped,
        })
    }
}
