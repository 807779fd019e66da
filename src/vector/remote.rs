//! Remote vector store speaking a Pinecone-style query API

use super::store::{VectorMatch, VectorSearchError, VectorStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

/// `POST {endpoint}/query` with an `Api-Key` header
pub struct HttpVectorStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    namespace: Option<String>,
    dimension: usize,
}

impl HttpVectorStore {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        namespace: Option<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            namespace: namespace.filter(|ns| !ns.is_empty()),
            dimension,
        }
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, VectorSearchError> {
        if vector.len() != self.dimension {
            return Err(VectorSearchError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/query", self.endpoint))
            .json(&QueryRequest {
                vector,
                top_k: k,
                namespace: self.namespace.as_deref(),
                include_metadata: false,
                include_values: false,
            });
        if let Some(key) = &self.api_key {
            request = request.header("Api-Key", key);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| VectorSearchError::Unavailable(e.to_string()))?;

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| VectorSearchError::Unavailable(format!("invalid response: {}", e)))?;

        Ok(body.matches)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let vector = [0.5_f32, 0.25];
        let request = QueryRequest {
            vector: &vector,
            top_k: 20,
            namespace: Some("ev-policy"),
            include_metadata: false,
            include_values: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 20);
        assert_eq!(json["namespace"], "ev-policy");
        assert_eq!(json["includeMetadata"], false);
    }

    #[test]
    fn test_response_parsing() {
        let body: QueryResponse = serde_json::from_str(
            r#"{"matches": [{"id": "ev-1", "score": 0.91, "values": []}], "namespace": ""}"#,
        )
        .unwrap();
        assert_eq!(body.matches.len(), 1);
        assert_eq!(body.matches[0].id, "ev-1");

        let empty: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.matches.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = HttpVectorStore::new("http://127.0.0.1:9", None, None, 2);
        let result = store.query(&[1.0, 0.0], 5).await;
        assert!(matches!(result, Err(VectorSearchError::Unavailable(_))));
    }
}
