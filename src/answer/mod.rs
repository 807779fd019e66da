//! Answer composition over retrieved policy documents

mod assistant;
mod chat;

pub use assistant::{Answer, AnswerOptions, AnswerSource, Assistant};
pub use chat::{ChatCompletionComposer, ChatOptions};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnswerError {
    #[error("Answer backend unavailable: {0}")]
    Unavailable(String),

    #[error("Answer request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Answer backend returned no content")]
    EmptyResponse,
}

/// A retrieved document handed to the composer, already truncated
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDocument {
    pub id: String,
    pub policy: String,
    pub excerpt: String,
}

/// Turns a question and its supporting documents into prose
#[async_trait]
pub trait AnswerComposer: Send + Sync {
    async fn compose(&self, query: &str, context: &[ContextDocument]) -> Result<String, AnswerError>;

    fn name(&self) -> &str;
}
