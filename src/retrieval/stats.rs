//! Query counters for the hybrid engine

use super::cache::CacheStats;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct EngineStats {
    queries: AtomicU64,
    cache_hits: AtomicU64,
    degraded: AtomicU64,
    no_results: AtomicU64,
    total_latency_us: AtomicU64,
}

/// Point-in-time view of [`EngineStats`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    pub queries: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub degraded_queries: u64,
    pub no_result_queries: u64,
    pub average_latency_ms: f64,
    pub result_cache: CacheStats,
    pub embedding_cache: CacheStats,
}

impl EngineStats {
    pub fn record(&self, elapsed: Duration, cache_hit: bool, degraded: bool, no_results: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        if cache_hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if degraded {
            self.degraded.fetch_add(1, Ordering::Relaxed);
        }
        if no_results {
            self.no_results.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, result_cache: CacheStats, embedding_cache: CacheStats) -> StatsSnapshot {
        let queries = self.queries.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let total_us = self.total_latency_us.load(Ordering::Relaxed);

        let (cache_hit_rate, average_latency_ms) = if queries == 0 {
            (0.0, 0.0)
        } else {
            (
                cache_hits as f64 / queries as f64,
                total_us as f64 / queries as f64 / 1000.0,
            )
        };

        StatsSnapshot {
            queries,
            cache_hits,
            cache_hit_rate,
            degraded_queries: self.degraded.load(Ordering::Relaxed),
            no_result_queries: self.no_results.load(Ordering::Relaxed),
            average_latency_ms,
            result_cache,
            embedding_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let stats = EngineStats::default();
        stats.record(Duration::from_millis(10), false, false, false);
        stats.record(Duration::from_millis(2), true, false, false);
        stats.record(Duration::from_millis(6), false, true, true);

        let snap = stats.snapshot(CacheStats::default(), CacheStats::default());
        assert_eq!(snap.queries, 3);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.degraded_queries, 1);
        assert_eq!(snap.no_result_queries, 1);
        assert!((snap.average_latency_ms - 6.0).abs() < 1e-9);
        assert!((snap.cache_hit_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = EngineStats::default().snapshot(CacheStats::default(), CacheStats::default());
        assert_eq!(snap.queries, 0);
        assert_eq!(snap.average_latency_ms, 0.0);
    }
}
