//! HTTP client for an OpenAI-compatible embeddings API.
//!
//! The whole corpus batch goes out in a single request; the service must
//! return one vector per input. Responses carry an `index` per row, so
//! ordering is restored explicitly rather than trusted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Embedder, EmbedderError};
use crate::config::EmbeddingConfig;

pub struct RemoteEmbedder {
    endpoint: String,
    model: String,
    dimensions: usize,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedRow>,
}

#[derive(Deserialize)]
struct EmbedRow {
    index: usize,
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    /// Builds a client from config. The API key, when configured, is read
    /// from the named environment variable at construction time.
    pub fn from_config(cfg: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        let api_key = match &cfg.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(key) if !key.is_empty() => Some(key),
                _ => {
                    return Err(EmbedderError::RequestFailed(format!(
                        "environment variable {var} is not set"
                    )));
                }
            },
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;

        Ok(Self {
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            dimensions: cfg.dimensions,
            api_key,
            client,
        })
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let url = format!("{}/embeddings", self.endpoint);
        let body = EmbedRequest {
            model: &self.model,
            input,
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbedderError::RequestFailed(format!(
                "{url} returned {status}: {detail}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::RequestFailed(format!("invalid response body: {e}")))?;

        if parsed.data.len() != input.len() {
            return Err(EmbedderError::CountMismatch {
                expected: input.len(),
                returned: parsed.data.len(),
            });
        }

        // Restore input order from the per-row index
        let mut rows = parsed.data;
        rows.sort_by_key(|r| r.index);

        let mut vectors = Vec::with_capacity(rows.len());
        for row in rows {
            if row.embedding.len() != self.dimensions {
                return Err(EmbedderError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: row.embedding.len(),
                });
            }
            vectors.push(row.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let input = vec![text.to_string()];
        let mut vectors = self.request(&input).await?;
        vectors.pop().ok_or(EmbedderError::CountMismatch {
            expected: 1,
            returned: 0,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_key() {
        let cfg = EmbeddingConfig::default();
        let embedder = RemoteEmbedder::from_config(&cfg).unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert!(embedder.api_key.is_none());
    }

    #[test]
    fn test_from_config_missing_env_key_fails() {
        let mut cfg = EmbeddingConfig::default();
        cfg.api_key_env = Some("DOCRAG_TEST_KEY_THAT_IS_NOT_SET".to_string());
        assert!(RemoteEmbedder::from_config(&cfg).is_err());
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let mut cfg = EmbeddingConfig::default();
        cfg.endpoint = "http://localhost:9999/v1/".to_string();
        let embedder = RemoteEmbedder::from_config(&cfg).unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:9999/v1");
    }
}
