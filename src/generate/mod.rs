//! Grounded answer generation boundary.
//!
//! The generative model is an external collaborator behind the [`Generator`]
//! trait. The service layer enforces the grounding contract: empty retrieval
//! context short-circuits to [`NOT_FOUND_ANSWER`] without calling the model,
//! and the prompt instructs the model to return the same sentinel whenever
//! the answer is not present in the context.

pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

/// Fixed sentinel returned when no grounded answer exists.
pub const NOT_FOUND_ANSWER: &str = "Information not found in the knowledge base.";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Trait for answer generation implementations.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer to `question` using only `context`.
    async fn generate(&self, question: &str, context: &str) -> Result<String, GenerateError>;
}

/// Assembles the strict extractive prompt sent to the model.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are a STRICT enterprise RAG system.

CRITICAL RULES (MUST FOLLOW):
- Use ONLY the information explicitly present in CONTEXT.
- Do NOT rephrase using your own knowledge.
- Do NOT invent steps, phases, names, or structure.
- If the answer is not explicitly stated in CONTEXT,
  respond EXACTLY with:
  "{NOT_FOUND_ANSWER}"

TASK:
Extract and summarize ONLY what is written.

CONTEXT:
----------------
{context}
----------------

QUESTION:
{question}

ANSWER (only from context):
"#
    )
}
