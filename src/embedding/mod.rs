/// Query embedding
///
/// - EmbeddingProvider trait for abstraction over backends
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - HttpEmbeddingProvider for OpenAI-compatible remote endpoints
/// - EmbeddingClient adds timeout and an LRU cache on the query path
/// - embed_corpus batches document embedding for the in-process index
mod batch;
mod client;
mod provider;

pub use batch::{embed_corpus, DEFAULT_BATCH_SIZE};
pub use client::{EmbeddingClient, DEFAULT_EMBEDDING_CACHE_CAPACITY};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider, HttpEmbeddingProvider};
