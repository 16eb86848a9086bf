//! HTTP client for an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{build_prompt, GenerateError, Generator};
use crate::config::GenerationConfig;

pub struct ChatGenerator {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl ChatGenerator {
    /// Builds a client from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(cfg: &GenerationConfig) -> Result<Self, GenerateError> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GenerateError::MissingApiKey(cfg.api_key_env.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| GenerateError::RequestFailed(e.to_string()))?;

        Ok(Self {
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String, GenerateError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let prompt = build_prompt(question, context);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a strict extractive RAG assistant.",
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            // Extraction, not creativity
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerateError::RequestFailed(format!(
                "{url} returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::RequestFailed(format!("invalid response body: {e}")))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerateError::RequestFailed("response carried no choices".into()))?;

        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_fails_construction() {
        let mut cfg = GenerationConfig::default();
        cfg.api_key_env = "DOCRAG_TEST_GEN_KEY_THAT_IS_NOT_SET".to_string();
        assert!(matches!(
            ChatGenerator::from_config(&cfg),
            Err(GenerateError::MissingApiKey(_))
        ));
    }
}
