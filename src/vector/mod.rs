//! Vector retrieval path
//!
//! A [`VectorStore`] answers similarity queries; [`VectorRetriever`] bounds
//! each query with a timeout and turns matches into ranked hits.

mod memory;
mod remote;
mod retriever;
mod store;

pub use memory::{HnswParams, HnswVectorStore};
pub use remote::HttpVectorStore;
pub use retriever::VectorRetriever;
pub use store::{VectorMatch, VectorSearchError, VectorStore};
