//! Hybrid search combining BM25 and vector retrieval

use super::cache::{normalize_query, ResultCache};
use super::fusion::{reciprocal_rank_fusion, FusionConfig, FusionError, DEFAULT_RRF_K};
use super::stats::{EngineStats, StatsSnapshot};
use super::types::{FusedResult, RankedHit};
use crate::embedding::EmbeddingClient;
use crate::error::CivicaError;
use crate::lexical::{tokenize, LexicalIndex};
use crate::vector::VectorRetriever;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Tunables the engine reads on every query. Replaceable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSettings {
    pub vector_weight: f64,
    pub lexical_weight: f64,
    /// RRF constant `c`
    pub rrf_k: f64,
    /// Hits requested from each path before fusion
    pub retrieval_depth: usize,
    /// Fused results returned to the caller
    pub top_k: usize,
    pub cache_capacity: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            vector_weight: 0.5,
            lexical_weight: 0.5,
            rrf_k: DEFAULT_RRF_K,
            retrieval_depth: 20,
            top_k: 6,
            cache_capacity: 1000,
        }
    }
}

impl RetrievalSettings {
    /// Validate and derive the fusion parameters
    pub fn fusion_config(&self) -> Result<FusionConfig, FusionError> {
        if self.retrieval_depth == 0 {
            return Err(FusionError::InvalidParameter {
                name: "retrieval_depth",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.top_k == 0 {
            return Err(FusionError::InvalidParameter {
                name: "top_k",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(FusionError::InvalidParameter {
                name: "cache_capacity",
                message: "must be greater than 0".to_string(),
            });
        }

        FusionConfig::new(self.rrf_k, self.vector_weight, self.lexical_weight)
    }
}

/// Why a retrieval path contributed nothing to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Degradation {
    EmbeddingUnavailable(String),
    VectorSearchUnavailable(String),
    LexicalUnavailable(String),
    AnswerUnavailable(String),
}

/// Overall result classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// At least one fused result
    Ok,
    /// Retrieval ran but no document matched
    NoMatches,
    /// Every retrieval path failed
    NoResults,
}

/// What a query produced, including any degradation
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Normalized query the results were computed for
    pub query: String,
    pub results: Vec<FusedResult>,
    pub status: SearchStatus,
    pub degradations: Vec<Degradation>,
    pub cache_hit: bool,
    pub elapsed_ms: f64,
}

impl SearchOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Classify a finished query. Both paths failing is `NoResults`, distinct
/// from a healthy query that matched nothing.
pub fn classify(degradations: &[Degradation], results: &[FusedResult]) -> SearchStatus {
    if degradations.len() >= 2 {
        SearchStatus::NoResults
    } else if results.is_empty() {
        SearchStatus::NoMatches
    } else {
        SearchStatus::Ok
    }
}

struct ActiveSettings {
    settings: RetrievalSettings,
    fusion: FusionConfig,
    /// Bumped by every settings change
    generation: u64,
}

/// Hybrid searcher: lexical and vector paths run concurrently, are fused
/// with weighted RRF, and memoized per normalized query.
///
/// Constructed explicitly and shared via `Arc`; there is no global instance.
pub struct HybridEngine {
    lexical: Arc<LexicalIndex>,
    embedder: Arc<EmbeddingClient>,
    vectors: Arc<VectorRetriever>,
    cache: ResultCache,
    active: RwLock<ActiveSettings>,
    stats: EngineStats,
}

impl HybridEngine {
    /// Wire the engine, failing fast on invalid settings or when the
    /// embedding model and vector store disagree on dimensionality.
    pub fn new(
        lexical: Arc<LexicalIndex>,
        embedder: Arc<EmbeddingClient>,
        vectors: Arc<VectorRetriever>,
        settings: RetrievalSettings,
    ) -> Result<Self, CivicaError> {
        let fusion = settings.fusion_config()?;

        if embedder.dimension() != vectors.dimension() {
            return Err(CivicaError::Configuration(format!(
                "embedding model '{}' produces {}D vectors but vector store '{}' indexes {}D",
                embedder.model_name(),
                embedder.dimension(),
                vectors.store_name(),
                vectors.dimension()
            )));
        }

        tracing::info!(
            "Hybrid engine ready: {} documents, weights vector={} lexical={}, rrf_k={}, depth={}, top_k={}",
            lexical.len(),
            settings.vector_weight,
            settings.lexical_weight,
            settings.rrf_k,
            settings.retrieval_depth,
            settings.top_k
        );

        Ok(Self {
            lexical,
            embedder,
            vectors,
            cache: ResultCache::new(settings.cache_capacity),
            active: RwLock::new(ActiveSettings {
                settings,
                fusion,
                generation: 0,
            }),
            stats: EngineStats::default(),
        })
    }

    /// Current settings
    pub fn settings(&self) -> RetrievalSettings {
        self.read_active().0
    }

    fn read_active(&self) -> (RetrievalSettings, FusionConfig, u64) {
        let active = self
            .active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (active.settings.clone(), active.fusion, active.generation)
    }

    /// Replace the tunables without touching the lexical index.
    ///
    /// Cached rankings were fused under the old parameters and are dropped.
    pub fn update_settings(&self, settings: RetrievalSettings) -> Result<(), FusionError> {
        let fusion = settings.fusion_config()?;

        let mut active = self
            .active
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.cache.resize(settings.cache_capacity);
        self.cache.clear();
        tracing::info!(
            "Retrieval settings updated: weights vector={} lexical={}, rrf_k={}, depth={}, top_k={}",
            settings.vector_weight,
            settings.lexical_weight,
            settings.rrf_k,
            settings.retrieval_depth,
            settings.top_k
        );
        let generation = active.generation + 1;
        *active = ActiveSettings {
            settings,
            fusion,
            generation,
        };

        Ok(())
    }

    /// Perform hybrid search
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return Err(SearchError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }

        let (settings, fusion, generation) = self.read_active();

        if let Some(results) = self.cache.get(&normalized) {
            tracing::debug!("Result cache hit for '{}'", normalized);
            let status = if results.is_empty() {
                SearchStatus::NoMatches
            } else {
                SearchStatus::Ok
            };
            return Ok(self.finish(normalized, results, status, Vec::new(), true, start));
        }

        // Step 1: both paths concurrently
        let depth = settings.retrieval_depth;
        let (lexical, vector) = tokio::join!(
            self.lexical_search(&normalized, depth),
            self.vector_search(&normalized, depth)
        );

        let mut degradations = Vec::new();
        let lexical_hits = lexical.unwrap_or_else(|d| {
            degradations.push(d);
            Vec::new()
        });
        let vector_hits = vector.unwrap_or_else(|d| {
            degradations.push(d);
            Vec::new()
        });

        for degradation in &degradations {
            tracing::warn!("Query '{}' degraded: {:?}", normalized, degradation);
        }

        // Step 2: Reciprocal Rank Fusion
        let results = reciprocal_rank_fusion(&lexical_hits, &vector_hits, settings.top_k, &fusion);

        let status = classify(&degradations, &results);

        // Degraded rankings are not memoized so the next query retries both paths
        if degradations.is_empty() {
            self.memoize(generation, &normalized, &results);
        }

        Ok(self.finish(normalized, results, status, degradations, false, start))
    }

    /// Cache `results` unless the settings they were fused under have since
    /// been replaced. Holding the read lock keeps `update_settings` from
    /// clearing the cache between the check and the insert.
    fn memoize(&self, generation: u64, query: &str, results: &[FusedResult]) {
        let active = self
            .active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if active.generation == generation {
            self.cache.put(query, results.to_vec());
        } else {
            tracing::debug!("Settings changed during '{}', not caching", query);
        }
    }

    fn finish(
        &self,
        query: String,
        results: Vec<FusedResult>,
        status: SearchStatus,
        degradations: Vec<Degradation>,
        cache_hit: bool,
        start: Instant,
    ) -> SearchOutcome {
        let elapsed = start.elapsed();
        self.stats.record(
            elapsed,
            cache_hit,
            !degradations.is_empty(),
            status == SearchStatus::NoResults,
        );
        tracing::debug!(
            "Query '{}' -> {} results ({:?}) in {:.2}ms",
            query,
            results.len(),
            status,
            elapsed.as_secs_f64() * 1000.0
        );

        SearchOutcome {
            query,
            results,
            status,
            degradations,
            cache_hit,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    /// BM25 over the immutable index, on the blocking pool
    async fn lexical_search(&self, query: &str, depth: usize) -> Result<Vec<RankedHit>, Degradation> {
        let index = Arc::clone(&self.lexical);
        let tokens = tokenize(query);
        let started = Instant::now();

        let hits = tokio::task::spawn_blocking(move || index.search(&tokens, depth))
            .await
            .map_err(|e| Degradation::LexicalUnavailable(e.to_string()))?;

        tracing::debug!(
            "Lexical path: {} hits in {:.2}ms",
            hits.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(hits)
    }

    /// Embed then query the vector store; failures become degradations
    async fn vector_search(&self, query: &str, depth: usize) -> Result<Vec<RankedHit>, Degradation> {
        let started = Instant::now();

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| Degradation::EmbeddingUnavailable(e.to_string()))?;

        let hits = self
            .vectors
            .search(&embedding, depth)
            .await
            .map_err(|e| Degradation::VectorSearchUnavailable(e.to_string()))?;

        tracing::debug!(
            "Vector path: {} hits in {:.2}ms",
            hits.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(hits)
    }

    pub fn lexical_index(&self) -> &Arc<LexicalIndex> {
        &self.lexical
    }

    /// Drop every memoized ranking
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats
            .snapshot(self.cache.stats(), self.embedder.cache_stats())
    }
}
