//! Query-side embedding client: timeout, dimension check, LRU memoization

use super::provider::{EmbeddingError, EmbeddingProvider};
use crate::retrieval::{CacheStats, QueryCache};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_EMBEDDING_CACHE_CAPACITY: usize = 512;

/// Embeds (already normalized) query text, serving repeats from cache.
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    cache: QueryCache<Arc<Vec<f32>>>,
    timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache_capacity: usize, timeout: Duration) -> Self {
        Self {
            provider,
            cache: QueryCache::new(cache_capacity),
            timeout,
        }
    }

    /// Embed `query`. The caller passes the normalized query so that
    /// equivalent phrasings share one cache slot.
    pub async fn embed(&self, query: &str) -> Result<Arc<Vec<f32>>, EmbeddingError> {
        if let Some(vector) = self.cache.get(query) {
            tracing::debug!("Embedding cache hit for '{}'", query);
            return Ok(vector);
        }

        let vector = tokio::time::timeout(self.timeout, self.provider.embed(query))
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout))??;

        if vector.len() != self.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                actual: vector.len(),
            });
        }

        let vector = Arc::new(vector);
        self.cache.put(query, Arc::clone(&vector));
        Ok(vector)
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic provider that counts calls
    struct CountingProvider {
        calls: AtomicUsize,
        dimension: usize,
        delay: Duration,
        fail: bool,
    }

    impl CountingProvider {
        fn new(dimension: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                dimension,
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(EmbeddingError::Unavailable("connection refused".into()));
            }
            Ok(vec![text.len() as f32; self.dimension])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let provider = Arc::new(CountingProvider::new(3));
        let client = EmbeddingClient::new(provider.clone(), 8, Duration::from_secs(1));

        let first = client.embed("ev policy").await.unwrap();
        let second = client.embed("ev policy").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut provider = CountingProvider::new(3);
        provider.delay = Duration::from_millis(200);
        let client = EmbeddingClient::new(Arc::new(provider), 8, Duration::from_millis(10));

        let err = client.embed("slow").await.unwrap_err();
        assert_eq!(err, EmbeddingError::Timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let mut provider = CountingProvider::new(3);
        provider.fail = true;
        let provider = Arc::new(provider);
        let client = EmbeddingClient::new(provider.clone(), 8, Duration::from_secs(1));

        assert!(client.embed("q").await.is_err());
        assert!(client.embed("q").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lru_bound() {
        let provider = Arc::new(CountingProvider::new(2));
        let client = EmbeddingClient::new(provider.clone(), 2, Duration::from_secs(1));

        client.embed("a").await.unwrap();
        client.embed("b").await.unwrap();
        client.embed("c").await.unwrap();
        client.embed("a").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
        assert_eq!(client.cache_stats().entries, 2);
    }
}
