//! Hybrid retrieval
//!
//! Lexical (BM25) and vector rankings are produced concurrently, merged with
//! weighted Reciprocal Rank Fusion, and memoized per normalized query.

mod cache;
mod fusion;
mod hybrid;
mod stats;
mod types;

pub use cache::{normalize_query, CacheEntry, CacheStats, QueryCache, ResultCache};
pub use fusion::{reciprocal_rank_fusion, FusionConfig, FusionError, FusionWeights, DEFAULT_RRF_K};
pub use hybrid::{
    classify, Degradation, HybridEngine, RetrievalSettings, SearchError, SearchOutcome,
    SearchStatus,
};
pub use stats::{EngineStats, StatsSnapshot};
pub use types::{rank_hits, FusedResult, RankedHit};
