//! Ingestion-time building blocks: chunking and per-chunk provenance.

pub mod chunker;
pub mod metadata;
