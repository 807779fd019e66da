//! Retrieval followed by answer composition

use super::{AnswerComposer, AnswerError, ContextDocument};
use crate::corpus::Corpus;
use crate::retrieval::{Degradation, HybridEngine, SearchError, SearchStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const NO_SOURCES_MESSAGE: &str = "No relevant policy documents were found for this question.";
const FALLBACK_MESSAGE: &str =
    "An answer could not be generated right now. The most relevant policy documents are listed below.";

#[derive(Debug, Clone)]
pub struct AnswerOptions {
    /// How many fused results are passed to the composer
    pub context_documents: usize,
    /// Per-document excerpt length, in characters
    pub excerpt_chars: usize,
    pub timeout: Duration,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            context_documents: 4,
            excerpt_chars: 800,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerSource {
    pub id: String,
    pub policy: String,
    pub domain: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub text: String,
    /// `false` when `text` is a fallback message
    pub composed: bool,
    pub sources: Vec<AnswerSource>,
    pub degradations: Vec<Degradation>,
    pub status: SearchStatus,
}

pub struct Assistant {
    engine: Arc<HybridEngine>,
    corpus: Arc<Corpus>,
    composer: Option<Arc<dyn AnswerComposer>>,
    options: AnswerOptions,
}

impl Assistant {
    /// `composer: None` answers with sources only
    pub fn new(
        engine: Arc<HybridEngine>,
        corpus: Arc<Corpus>,
        composer: Option<Arc<dyn AnswerComposer>>,
        options: AnswerOptions,
    ) -> Self {
        Self {
            engine,
            corpus,
            composer,
            options,
        }
    }

    pub fn engine(&self) -> &Arc<HybridEngine> {
        &self.engine
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, SearchError> {
        let outcome = self.engine.search(question).await?;
        let mut degradations = outcome.degradations;

        let sources: Vec<AnswerSource> = outcome
            .results
            .iter()
            .filter_map(|result| {
                self.corpus.get(&result.doc_id).map(|doc| AnswerSource {
                    id: doc.id.clone(),
                    policy: doc.metadata.policy.clone(),
                    domain: doc.metadata.domain.clone(),
                    score: result.score,
                })
            })
            .collect();

        if sources.is_empty() {
            return Ok(Answer {
                question: outcome.query,
                text: NO_SOURCES_MESSAGE.to_string(),
                composed: false,
                sources,
                degradations,
                status: outcome.status,
            });
        }

        let context: Vec<ContextDocument> = sources
            .iter()
            .take(self.options.context_documents)
            .filter_map(|source| self.corpus.get(&source.id))
            .map(|doc| ContextDocument {
                id: doc.id.clone(),
                policy: doc.metadata.policy.clone(),
                excerpt: doc.excerpt(self.options.excerpt_chars),
            })
            .collect();

        let composed = match &self.composer {
            Some(composer) => {
                tracing::debug!(
                    "Composing answer with {} using {} documents",
                    composer.name(),
                    context.len()
                );
                tokio::time::timeout(self.options.timeout, composer.compose(question, &context))
                    .await
                    .unwrap_or(Err(AnswerError::Timeout(self.options.timeout)))
            }
            None => Err(AnswerError::Unavailable(
                "answer generation is disabled".to_string(),
            )),
        };

        let (text, composed) = match composed {
            Ok(text) => (text, true),
            Err(e) => {
                tracing::warn!("Answer composition failed: {}", e);
                degradations.push(Degradation::AnswerUnavailable(e.to_string()));
                (FALLBACK_MESSAGE.to_string(), false)
            }
        };

        Ok(Answer {
            question: outcome.query,
            text,
            composed,
            sources,
            degradations,
            status: outcome.status,
        })
    }
}
