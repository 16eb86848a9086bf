//! Upload/ask orchestration.
//!
//! Ties the corpus store, extraction, chunking, index rebuild, retrieval,
//! and generation together behind two operations: [`RagService::submit_document`]
//! and [`RagService::ask`]. At most one rebuild runs at a time; a concurrent
//! attempt is rejected rather than interleaved, so two writers can never race
//! to publish a snapshot.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::embedder::Embedder;
use crate::extract::{self, ExtractError};
use crate::generate::{Generator, NOT_FOUND_ANSWER};
use crate::index::{IndexBuilder, IndexError, RebuildReport, SnapshotStore};
use crate::ingest::chunker;
use crate::retrieve::{Hit, Retriever, RetrieveError};
use crate::store::{self, CorpusStore};

/// User-visible failures. Each renders as a short status plus message;
/// internal detail stays on the server side of the boundary.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid document name")]
    InvalidName,

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("a rebuild is already in progress; retry once it completes")]
    RebuildInProgress,

    #[error("corpus produced no usable chunks")]
    EmptyCorpus,

    #[error("no index snapshot has been published yet; upload a document first")]
    IndexUnavailable,

    #[error("index rebuild failed: {0}")]
    RebuildFailed(String),

    #[error("retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("answer generation failed: {0}")]
    GenerationFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ExtractError> for ServiceError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedFormat(ext) => ServiceError::UnsupportedFormat(ext),
            ExtractError::ExtractionFailed(msg) => ServiceError::ExtractionFailed(msg),
        }
    }
}

impl ServiceError {
    fn from_index(e: IndexError) -> Self {
        match e {
            IndexError::EmptyCorpus => ServiceError::EmptyCorpus,
            other => ServiceError::RebuildFailed(other.to_string()),
        }
    }

    fn from_retrieve(e: RetrieveError) -> Self {
        match e {
            RetrieveError::IndexUnavailable => ServiceError::IndexUnavailable,
            other => ServiceError::RetrievalFailed(other.to_string()),
        }
    }
}

/// Successful upload response: the document is searchable once this returns.
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub filename: String,
    pub documents: usize,
    pub chunks: usize,
    pub snapshot_version: String,
}

/// Answer plus the ranked chunks it was grounded on.
#[derive(Debug, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub sources: Vec<Hit>,
}

pub struct RagService {
    config: Config,
    store: CorpusStore,
    snapshots: SnapshotStore,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    rebuild_lock: tokio::sync::Mutex<()>,
    retriever: tokio::sync::RwLock<Option<Retriever>>,
}

impl RagService {
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let store = CorpusStore::open(&config.data_dir)?;
        let snapshots = SnapshotStore::open(store.snapshots_dir())?;
        Ok(Self {
            config,
            store,
            snapshots,
            embedder,
            generator,
            rebuild_lock: tokio::sync::Mutex::new(()),
            retriever: tokio::sync::RwLock::new(None),
        })
    }

    /// Admits a new document and rebuilds the whole corpus index.
    ///
    /// Synchronous and blocking by design: the success response is not sent
    /// until the document is fully searchable. Every upload re-embeds and
    /// re-indexes the entire corpus — O(total chunks), not O(new chunks); an
    /// intentional simplicity trade-off at the corpus sizes this system
    /// targets.
    pub async fn submit_document(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<UploadOutcome, ServiceError> {
        let name = store::sanitize_name(name).ok_or(ServiceError::InvalidName)?;
        if !extract::is_supported(&name) {
            let ext = std::path::Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("<none>")
                .to_string();
            return Err(ServiceError::UnsupportedFormat(ext));
        }

        let _guard = self
            .rebuild_lock
            .try_lock()
            .map_err(|_| ServiceError::RebuildInProgress)?;

        info!("Upload received: {name} ({} bytes)", bytes.len());
        self.store
            .save_raw(&name, bytes)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let text = extract::extract_text(&name, bytes)?;
        self.store
            .save_text(&name, &text)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let chunks =
            chunker::split_text(&text, self.config.chunk_size, self.config.chunk_overlap);
        self.store
            .save_chunks(&name, &chunks)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let report = IndexBuilder::new(&self.store, &*self.embedder)
            .rebuild(&self.snapshots)
            .await
            .map_err(ServiceError::from_index)?;

        self.refresh_retriever().await?;
        Ok(UploadOutcome {
            filename: name,
            documents: report.documents,
            chunks: report.chunks,
            snapshot_version: report.version,
        })
    }

    /// Rebuilds the index over the corpus as currently stored, without
    /// admitting a new document.
    pub async fn rebuild(&self) -> Result<RebuildReport, ServiceError> {
        let _guard = self
            .rebuild_lock
            .try_lock()
            .map_err(|_| ServiceError::RebuildInProgress)?;

        let report = IndexBuilder::new(&self.store, &*self.embedder)
            .rebuild(&self.snapshots)
            .await
            .map_err(ServiceError::from_index)?;

        self.refresh_retriever().await?;
        Ok(report)
    }

    /// Retrieves the top-`k` chunks for a question against the latest
    /// published snapshot.
    pub async fn search(&self, question: &str, k: usize) -> Result<Vec<Hit>, ServiceError> {
        self.refresh_retriever().await?;
        let guard = self.retriever.read().await;
        let retriever = guard.as_ref().ok_or(ServiceError::IndexUnavailable)?;
        retriever
            .search(question, k)
            .await
            .map_err(ServiceError::from_retrieve)
    }

    /// Answers a question from retrieved context only.
    pub async fn ask(&self, question: &str) -> Result<AskOutcome, ServiceError> {
        let hits = self.search(question, self.config.search_top_k).await?;

        let context = hits
            .iter()
            .map(|h| h.record.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        // Grounding contract: nothing retrieved means the fixed sentinel,
        // the generator is never consulted.
        if context.trim().is_empty() {
            return Ok(AskOutcome {
                answer: NOT_FOUND_ANSWER.to_string(),
                sources: hits,
            });
        }

        let answer = self
            .generator
            .generate(question, &context)
            .await
            .map_err(|e| ServiceError::GenerationFailed(e.to_string()))?;

        Ok(AskOutcome {
            answer,
            sources: hits,
        })
    }

    /// Re-opens the cached retriever when the published snapshot version has
    /// moved. A retriever already open keeps serving its loaded snapshot
    /// until this notices a newer version.
    async fn refresh_retriever(&self) -> Result<(), ServiceError> {
        let published = self
            .snapshots
            .current_version()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let Some(published) = published else {
            return Ok(());
        };

        {
            let guard = self.retriever.read().await;
            if let Some(r) = guard.as_ref() {
                if r.version() == published {
                    return Ok(());
                }
            }
        }

        let mut guard = self.retriever.write().await;
        if let Some(r) = guard.as_ref() {
            if r.version() == published {
                return Ok(());
            }
        }
        match Retriever::open(&self.snapshots, self.embedder.clone()) {
            Ok(r) => {
                info!("Retriever now serving snapshot {}", r.version());
                *guard = Some(r);
                Ok(())
            }
            Err(RetrieveError::IndexUnavailable) => Ok(()),
            Err(e) => Err(ServiceError::from_retrieve(e)),
        }
    }
}
