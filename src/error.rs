use crate::answer::AnswerError;
use crate::corpus::CorpusError;
use crate::embedding::EmbeddingError;
use crate::lexical::IndexBuildError;
use crate::retrieval::{FusionError, SearchError};
use crate::vector::VectorSearchError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for civica
#[derive(Error, Debug)]
pub enum CivicaError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Startup wiring that cannot serve queries (e.g. embedding/vector
    /// dimensionality mismatch)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Corpus could not be read or parsed
    #[error(transparent)]
    Corpus(CorpusError),

    /// Lexical index could not be built; no queries may be served
    #[error(transparent)]
    IndexBuild(#[from] IndexBuildError),

    /// Embedding backend failed during startup work
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Vector store failed during startup work
    #[error(transparent)]
    VectorSearch(#[from] VectorSearchError),

    /// Fusion parameters rejected
    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// Query rejected by the engine
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Answer generation failed
    #[error(transparent)]
    Answer(#[from] AnswerError),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<CorpusError> for CivicaError {
    fn from(err: CorpusError) -> Self {
        match err {
            CorpusError::Invalid(build) => CivicaError::IndexBuild(build),
            other => CivicaError::Corpus(other),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for civica operations
pub type Result<T> = std::result::Result<T, CivicaError>;
