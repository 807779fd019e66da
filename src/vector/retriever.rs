//! Vector retrieval path: timeout-bounded store query turned into ranked hits

use super::store::{VectorSearchError, VectorStore};
use crate::retrieval::{rank_hits, RankedHit};
use std::sync::Arc;
use std::time::Duration;

pub struct VectorRetriever {
    store: Arc<dyn VectorStore>,
    timeout: Duration,
}

impl VectorRetriever {
    pub fn new(store: Arc<dyn VectorStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// At most `k` hits by descending similarity, ties broken by document id.
    ///
    /// Every failure, including an expired timeout, comes back as a
    /// [`VectorSearchError`]; transport errors never leak through.
    pub async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<RankedHit>, VectorSearchError> {
        if vector.len() != self.store.dimension() {
            return Err(VectorSearchError::InvalidDimension {
                expected: self.store.dimension(),
                actual: vector.len(),
            });
        }

        let matches = tokio::time::timeout(self.timeout, self.store.query(vector, k))
            .await
            .map_err(|_| VectorSearchError::Timeout(self.timeout))??;

        let scored = matches
            .into_iter()
            .filter(|m| !m.score.is_nan())
            .map(|m| (m.id, m.score))
            .collect();

        Ok(rank_hits(scored, k))
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorMatch;
    use async_trait::async_trait;

    struct FixedStore {
        matches: Vec<VectorMatch>,
        delay: Duration,
    }

    #[async_trait]
    impl VectorStore for FixedStore {
        async fn query(&self, _vector: &[f32], _k: usize) -> Result<Vec<VectorMatch>, VectorSearchError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.matches.clone())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn m(id: &str, score: f32) -> VectorMatch {
        VectorMatch {
            id: id.to_string(),
            score,
        }
    }

    #[tokio::test]
    async fn test_ranks_unsorted_backend_output() {
        let store = FixedStore {
            matches: vec![m("c", 0.7), m("b", 0.9), m("a", 0.7), m("nan", f32::NAN)],
            delay: Duration::ZERO,
        };
        let retriever = VectorRetriever::new(Arc::new(store), Duration::from_secs(1));

        let hits = retriever.search(&[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(hits[2].rank, 3);
    }

    #[tokio::test]
    async fn test_truncates_to_k() {
        let store = FixedStore {
            matches: vec![m("a", 0.9), m("b", 0.8), m("c", 0.7)],
            delay: Duration::ZERO,
        };
        let retriever = VectorRetriever::new(Arc::new(store), Duration::from_secs(1));
        assert_eq!(retriever.search(&[1.0, 0.0], 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout() {
        let store = FixedStore {
            matches: vec![m("a", 0.9)],
            delay: Duration::from_millis(200),
        };
        let retriever = VectorRetriever::new(Arc::new(store), Duration::from_millis(10));

        let err = retriever.search(&[1.0, 0.0], 5).await.unwrap_err();
        assert_eq!(err, VectorSearchError::Timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = FixedStore {
            matches: Vec::new(),
            delay: Duration::ZERO,
        };
        let retriever = VectorRetriever::new(Arc::new(store), Duration::from_secs(1));
        assert!(matches!(
            retriever.search(&[1.0, 0.0, 0.0], 5).await,
            Err(VectorSearchError::InvalidDimension { .. })
        ));
    }
}
