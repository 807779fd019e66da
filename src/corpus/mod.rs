//! Policy document corpus
//!
//! Documents are produced by offline ingestion and arrive here as a JSON array
//! or JSON-lines file. They are tokenized once on load and never mutated.

use crate::lexical::{check_documents, tokenize, IndexBuildError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to read corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse corpus file {path} (line {line}): {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] IndexBuildError),
}

/// Where a document came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Policy name (e.g. "EV Policy 2022")
    #[serde(default)]
    pub policy: String,
    /// Domain tag (e.g. "transport", "excise")
    #[serde(default)]
    pub domain: String,
}

/// Immutable unit of the corpus
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    /// Normalized lexical tokens, derived once at construction
    pub tokens: Vec<String>,
    pub metadata: SourceMetadata,
    embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: SourceMetadata) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            tokens: tokenize(&text),
            text,
            metadata,
            embedding: None,
        }
    }

    /// Attach a precomputed embedding (used to seed an in-process vector store)
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    /// Leading `max_chars` characters, with an ellipsis when truncated.
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }
}

/// On-disk record shape
#[derive(Debug, Deserialize)]
struct DocumentRecord {
    id: String,
    #[serde(alias = "content")]
    text: String,
    #[serde(default)]
    policy: String,
    #[serde(default, alias = "namespace")]
    domain: String,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl From<DocumentRecord> for Document {
    fn from(record: DocumentRecord) -> Self {
        let doc = Document::new(
            record.id,
            record.text,
            SourceMetadata {
                policy: record.policy,
                domain: record.domain,
            },
        );
        match record.embedding {
            Some(vector) => doc.with_embedding(vector),
            None => doc,
        }
    }
}

/// The full document set, addressable by id.
#[derive(Debug)]
pub struct Corpus {
    documents: Vec<Arc<Document>>,
    by_id: AHashMap<String, usize>,
}

impl Corpus {
    /// Build a corpus, rejecting empty sets and duplicate or blank ids.
    pub fn new(documents: Vec<Document>) -> Result<Self, CorpusError> {
        check_documents(&documents)?;

        let by_id = documents
            .iter()
            .enumerate()
            .map(|(pos, doc)| (doc.id.clone(), pos))
            .collect();

        Ok(Self {
            documents: documents.into_iter().map(Arc::new).collect(),
            by_id,
        })
    }

    /// Load a corpus from a JSON array (`.json`) or JSON-lines file.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let records = if content.trim_start().starts_with('[') {
            serde_json::from_str::<Vec<DocumentRecord>>(&content).map_err(|source| {
                CorpusError::Parse {
                    path: path.to_path_buf(),
                    line: source.line(),
                    source,
                }
            })?
        } else {
            let mut records = Vec::new();
            for (idx, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record = serde_json::from_str::<DocumentRecord>(line).map_err(|source| {
                    CorpusError::Parse {
                        path: path.to_path_buf(),
                        line: idx + 1,
                        source,
                    }
                })?;
                records.push(record);
            }
            records
        };

        let corpus = Self::new(records.into_iter().map(Document::from).collect())?;
        tracing::info!("Loaded {} documents from {:?}", corpus.len(), path);
        Ok(corpus)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Document>> {
        self.by_id.get(id).map(|&pos| &self.documents[pos])
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().map(|doc| doc.as_ref())
    }

    /// Owned copies of every document, in load order (index build input)
    pub fn to_vec(&self) -> Vec<Document> {
        self.documents().cloned().collect()
    }

    /// `(id, embedding)` for every document carrying a precomputed vector
    pub fn embeddings(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.documents()
            .filter_map(|doc| doc.embedding().map(|v| (doc.id.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
