//! Per-chunk provenance metadata.
//!
//! One [`MetadataRecord`] is built for every non-empty chunk of a document.
//! The record carries everything needed to trace a retrieval hit back to its
//! source without re-reading the corpus: document name, chunk ordinal, and
//! the chunk text itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::DocumentEntry;

/// A document whose persisted artifacts are inconsistent: chunk storage
/// without an extracted-text entry, or vice versa. Signals an upstream
/// extraction/chunking problem and must be surfaced, not masked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("document {name}: {detail}")]
pub struct ProvenanceMismatch {
    pub name: String,
    pub detail: String,
}

/// Provenance for one chunk. Position `i` of a snapshot's metadata list
/// describes the chunk whose embedding sits at position `i` of the vector
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Name of the source document.
    pub document_name: String,
    /// Stable identifier, `{document_name}_chunk_{ordinal}`.
    pub chunk_id: String,
    /// Position of the chunk within its document's chunk file. Also serves
    /// as the tie-break marker when distances are equal.
    pub ordinal: usize,
    /// Chunk text, duplicated here so retrieval never re-reads source files.
    pub text: String,
    /// Chunk length in characters.
    pub length: usize,
}

/// Checks that a document has both of its persisted artifacts before
/// metadata can be built for it.
pub fn check_provenance(entry: &DocumentEntry) -> Result<(), ProvenanceMismatch> {
    match (entry.has_text, entry.has_chunks) {
        (true, true) => Ok(()),
        (true, false) => Err(ProvenanceMismatch {
            name: entry.name.clone(),
            detail: "extracted text present but no chunk file".to_string(),
        }),
        (false, true) => Err(ProvenanceMismatch {
            name: entry.name.clone(),
            detail: "chunk file present but no extracted text".to_string(),
        }),
        (false, false) => Err(ProvenanceMismatch {
            name: entry.name.clone(),
            detail: "neither extracted text nor chunk file present".to_string(),
        }),
    }
}

/// Builds one record per non-empty chunk of a document.
///
/// Ordinals count positions in the chunk file, including positions whose
/// chunk is whitespace-only and therefore dropped. Filtering and ordinal
/// assignment happen together, so dropping a chunk never shifts the
/// provenance of the survivors.
pub fn build_records(document_name: &str, chunks: &[String]) -> Vec<MetadataRecord> {
    let mut records = Vec::with_capacity(chunks.len());
    for (ordinal, chunk) in chunks.iter().enumerate() {
        let text = chunk.trim();
        if text.is_empty() {
            continue;
        }
        records.push(MetadataRecord {
            document_name: document_name.to_string(),
            chunk_id: format!("{document_name}_chunk_{ordinal}"),
            ordinal,
            length: text.chars().count(),
            text: text.to_string(),
        });
    }
    records
}
