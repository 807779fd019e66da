//! Vector store contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorSearchError {
    #[error("Vector search unavailable: {0}")]
    Unavailable(String),

    #[error("Vector search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Insert failed: {0}")]
    InsertError(String),
}

/// One match from a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity, higher is more similar
    pub score: f32,
}

/// A similarity-search backend holding document vectors
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `k` nearest documents to `vector`
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, VectorSearchError>;

    /// Dimensionality of the indexed vectors
    fn dimension(&self) -> usize;

    /// Backend name for logs
    fn name(&self) -> &str;
}
