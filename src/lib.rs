//! Civica - Hybrid Policy Document Retrieval
//!
//! Answers natural-language questions about municipal policy documents by
//! running BM25 keyword search and vector similarity search concurrently,
//! fusing the two rankings with weighted Reciprocal Rank Fusion, and
//! optionally composing a grounded answer from the top documents.

pub mod answer;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod lexical;
pub mod retrieval;
pub mod vector;

pub use error::{CivicaError, Result};
