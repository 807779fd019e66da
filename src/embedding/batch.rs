/// Batch embedding of corpus documents for the in-process vector index
use super::{EmbeddingError, EmbeddingProvider};
use crate::corpus::Corpus;
use std::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// `(doc_id, embedding)` for every document in the corpus.
///
/// Precomputed embeddings are used as-is; the remaining documents are
/// embedded in chunks of `batch_size`. Output follows corpus order.
pub async fn embed_corpus(
    provider: &dyn EmbeddingProvider,
    corpus: &Corpus,
    batch_size: usize,
) -> Result<Vec<(String, Vec<f32>)>, EmbeddingError> {
    let start = Instant::now();
    let batch_size = batch_size.max(1);

    let mut vectors: Vec<Option<Vec<f32>>> = corpus
        .documents()
        .map(|doc| doc.embedding().map(|v| v.to_vec()))
        .collect();

    let pending: Vec<(usize, String)> = corpus
        .documents()
        .enumerate()
        .filter(|(pos, _)| vectors[*pos].is_none())
        .map(|(pos, doc)| (pos, doc.text.clone()))
        .collect();

    info!(
        "Embedding {} of {} documents with {} (batch size {})",
        pending.len(),
        corpus.len(),
        provider.model_name(),
        batch_size
    );

    for (batch_no, chunk) in pending.chunks(batch_size).enumerate() {
        let texts: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = provider.embed_batch(&texts).await?;

        if embeddings.len() != chunk.len() {
            return Err(EmbeddingError::Unavailable(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                embeddings.len()
            )));
        }

        for ((pos, _), embedding) in chunk.iter().zip(embeddings) {
            vectors[*pos] = Some(embedding);
        }
        debug!("Embedded batch {} ({} documents)", batch_no + 1, chunk.len());
    }

    let embedded = corpus
        .documents()
        .zip(vectors)
        .filter_map(|(doc, vector)| vector.map(|v| (doc.id.clone(), v)))
        .collect();

    info!(
        "Corpus embeddings ready in {}ms",
        start.elapsed().as_millis()
    );
    Ok(embedded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Document, SourceMetadata};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Encodes text length; counts batch calls
    struct LengthProvider {
        batches: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    #[tokio::test]
    async fn test_embeds_missing_in_batches() {
        let docs = vec![
            Document::new("a", "one", SourceMetadata::default()),
            Document::new("b", "three", SourceMetadata::default()).with_embedding(vec![9.0, 9.0]),
            Document::new("c", "fifteen", SourceMetadata::default()),
            Document::new("d", "xy", SourceMetadata::default()),
        ];
        let corpus = Corpus::new(docs).unwrap();
        let provider = LengthProvider {
            batches: AtomicUsize::new(0),
        };

        let embedded = embed_corpus(&provider, &corpus, 2).await.unwrap();

        let ids: Vec<&str> = embedded.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(embedded[0].1, vec![3.0, 1.0]);
        assert_eq!(embedded[1].1, vec![9.0, 9.0]);
        assert_eq!(embedded[2].1, vec![7.0, 1.0]);
        // three pending documents in batches of two
        assert_eq!(provider.batches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_all_precomputed_skips_provider() {
        let docs = vec![Document::new("a", "one", SourceMetadata::default()).with_embedding(vec![1.0, 0.0])];
        let corpus = Corpus::new(docs).unwrap();
        let provider = LengthProvider {
            batches: AtomicUsize::new(0),
        };

        let embedded = embed_corpus(&provider, &corpus, DEFAULT_BATCH_SIZE).await.unwrap();
        assert_eq!(embedded.len(), 1);
        assert_eq!(provider.batches.load(Ordering::SeqCst), 0);
    }
}
