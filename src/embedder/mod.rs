/// Embedding service boundary.
///
/// The neural embedding model is an external collaborator consumed through
/// this trait; the index builder and retriever receive an implementation at
/// construction time, which keeps the model substitutable by a test double.
pub mod mock;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    RequestFailed(String),

    #[error("embedding service returned {returned} vectors for {expected} inputs")]
    CountMismatch { expected: usize, returned: usize },

    #[error("embedding dimension {actual} does not match configured {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow concurrent use behind
/// `Arc`. Batch embedding preserves input order: output vector `i` embeds
/// input text `i`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors, order preserved.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}
