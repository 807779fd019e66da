/// In-process HNSW vector store for similarity search
use super::store::{VectorMatch, VectorSearchError, VectorStore};
use async_trait::async_trait;
use hnsw_rs::prelude::*;

const MAX_LAYERS: usize = 16;

/// HNSW construction/search parameters
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    /// Connections per layer
    pub m: usize,
    /// Construction beam width (higher = better recall, slower build)
    pub ef_construction: usize,
    /// Search beam width (higher = better recall, slower search)
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
        }
    }
}

/// HNSW index over document embeddings
///
/// Uses cosine distance; similarity is reported as `1 - distance`. Built
/// once, then only read.
pub struct HnswVectorStore {
    index: Hnsw<'static, f32, DistCosine>,
    /// Internal HNSW id -> document id
    ids: Vec<String>,
    dimension: usize,
    params: HnswParams,
}

impl HnswVectorStore {
    /// Create an empty store sized for `capacity` vectors
    pub fn new(dimension: usize, capacity: usize, params: HnswParams) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            params.m,
            capacity.max(1),
            MAX_LAYERS,
            params.ef_construction,
            DistCosine,
        );

        Self {
            index,
            ids: Vec::with_capacity(capacity),
            dimension,
            params,
        }
    }

    /// Build a store from `(doc_id, embedding)` pairs
    pub fn build<I>(dimension: usize, params: HnswParams, items: I) -> Result<Self, VectorSearchError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let items: Vec<(String, Vec<f32>)> = items.into_iter().collect();
        let mut store = Self::new(dimension, items.len(), params);
        for (id, vector) in items {
            store.insert(id, &vector)?;
        }

        tracing::info!(
            "Built in-process vector index: {} vectors, {}D",
            store.len(),
            dimension
        );
        Ok(store)
    }

    /// Insert one document vector
    pub fn insert(&mut self, id: impl Into<String>, vector: &[f32]) -> Result<(), VectorSearchError> {
        if vector.len() != self.dimension {
            return Err(VectorSearchError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().all(|x| *x == 0.0) {
            return Err(VectorSearchError::InsertError(
                "zero vector has no cosine direction".to_string(),
            ));
        }

        let data = vector.to_vec();
        self.index.insert((&data, self.ids.len()));
        self.ids.push(id.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[async_trait]
impl VectorStore for HnswVectorStore {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, VectorSearchError> {
        if vector.len() != self.dimension {
            return Err(VectorSearchError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if k == 0 || self.ids.is_empty() {
            return Ok(Vec::new());
        }

        let ef = self.params.ef_search.max(k);
        let matches = self
            .index
            .search(vector, k, ef)
            .into_iter()
            .filter_map(|neighbour| {
                self.ids.get(neighbour.d_id).map(|id| VectorMatch {
                    id: id.clone(),
                    score: 1.0 - neighbour.distance,
                })
            })
            .collect();

        Ok(matches)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hnsw"
    }
}
