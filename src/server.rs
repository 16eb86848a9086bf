//! HTTP API surface.
//!
//! Two endpoints mirror the two external triggers: `POST /upload` (multipart
//! file) admits a document and blocks until it is searchable, `POST /ask`
//! answers a question with ranked sources. Failures render as a short status
//! plus message.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::service::{RagService, ServiceError};

/// Uploads above this size are rejected outright.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn router(service: Arc<RagService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/ask", post(ask))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Binds and serves until the process is stopped.
pub async fn serve(service: Arc<RagService>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {bind}");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    filename: String,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

async fn upload(State(service): State<Arc<RagService>>, mut multipart: Multipart) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.file_name().map(|s| s.to_string()) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some((name, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("failed to read upload: {e}"),
                        );
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("invalid multipart body: {e}"),
                );
            }
        }
    }

    let Some((name, bytes)) = file else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "multipart body carried no file field".to_string(),
        );
    };

    match service.submit_document(&name, &bytes).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(UploadResponse {
                status: "success",
                filename: outcome.filename,
                message: format!(
                    "Document indexed successfully ({} chunks, snapshot {})",
                    outcome.chunks, outcome.snapshot_version
                ),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

async fn ask(State(service): State<Arc<RagService>>, Json(req): Json<AskRequest>) -> Response {
    match service.ask(&req.question).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorBody {
            status: "error",
            message,
        }),
    )
        .into_response()
}

fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::InvalidName | ServiceError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
        ServiceError::ExtractionFailed(_) | ServiceError::EmptyCorpus => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::RebuildInProgress => StatusCode::CONFLICT,
        ServiceError::IndexUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::RebuildFailed(_)
        | ServiceError::RetrievalFailed(_)
        | ServiceError::GenerationFailed(_)
        | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        error_response(status_for(&self), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ServiceError::UnsupportedFormat("zip".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ServiceError::ExtractionFailed("bad pdf".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ServiceError::RebuildInProgress),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ServiceError::IndexUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&ServiceError::Internal("io".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
