//! BM25 (Okapi) index over a fixed document collection.
//!
//! The index is built once and never mutated; a rebuild produces a whole new
//! `LexicalIndex` value, so readers can share it behind an `Arc` without
//! synchronization.

use super::tokenizer::tokenize;
use crate::corpus::Document;
use crate::retrieval::{rank_hits, RankedHit};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexBuildError {
    #[error("Cannot build lexical index: document set is empty")]
    EmptyCorpus,

    #[error("Cannot build lexical index: document at position {position} has an empty id")]
    EmptyDocumentId { position: usize },

    #[error("Cannot build lexical index: duplicate document id '{id}'")]
    DuplicateDocument { id: String },

    #[error("Invalid BM25 parameters: {0}")]
    InvalidParams(String),
}

/// BM25 scoring constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f32,
    /// Document length normalization
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Params {
    pub fn new(k1: f32, b: f32) -> Result<Self, IndexBuildError> {
        if !k1.is_finite() || k1 < 0.0 {
            return Err(IndexBuildError::InvalidParams(format!(
                "k1 must be a non-negative number, got {}",
                k1
            )));
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(IndexBuildError::InvalidParams(format!(
                "b must be within [0, 1], got {}",
                b
            )));
        }
        Ok(Self { k1, b })
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: u32,
}

/// Inverted index with the corpus statistics BM25 needs.
#[derive(Debug)]
pub struct LexicalIndex {
    postings: AHashMap<String, Vec<Posting>>,
    /// IDF per term, computed once at build time
    idf: AHashMap<String, f32>,
    doc_ids: Vec<String>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
    params: Bm25Params,
}

/// Reject document sets no index may be built from.
pub(crate) fn check_documents(documents: &[Document]) -> Result<(), IndexBuildError> {
    if documents.is_empty() {
        return Err(IndexBuildError::EmptyCorpus);
    }

    let mut seen: AHashSet<&str> = AHashSet::with_capacity(documents.len());
    for (position, doc) in documents.iter().enumerate() {
        if doc.id.trim().is_empty() {
            return Err(IndexBuildError::EmptyDocumentId { position });
        }
        if !seen.insert(doc.id.as_str()) {
            return Err(IndexBuildError::DuplicateDocument { id: doc.id.clone() });
        }
    }

    Ok(())
}

impl LexicalIndex {
    /// Build an index from the full document set.
    ///
    /// Fails with [`IndexBuildError::EmptyCorpus`] when `documents` is empty.
    pub fn build(documents: &[Document], params: Bm25Params) -> Result<Self, IndexBuildError> {
        check_documents(documents)?;

        let mut postings: AHashMap<String, Vec<Posting>> = AHashMap::new();
        let mut doc_ids = Vec::with_capacity(documents.len());
        let mut doc_lengths = Vec::with_capacity(documents.len());
        let mut total_length: u64 = 0;

        for (internal, doc) in documents.iter().enumerate() {
            let mut term_freqs: AHashMap<&str, u32> = AHashMap::new();
            for token in &doc.tokens {
                *term_freqs.entry(token.as_str()).or_insert(0) += 1;
            }

            for (term, tf) in term_freqs {
                postings.entry(term.to_string()).or_default().push(Posting {
                    doc: internal as u32,
                    tf,
                });
            }

            doc_ids.push(doc.id.clone());
            doc_lengths.push(doc.tokens.len() as u32);
            total_length += doc.tokens.len() as u64;
        }

        let n = documents.len() as f32;
        let avg_doc_length = total_length as f32 / n;

        // Lucene-style IDF: ln(1 + (N - df + 0.5) / (df + 0.5)) is strictly
        // positive, so every matched term contributes a positive score.
        let idf = postings
            .iter()
            .map(|(term, list)| {
                let df = list.len() as f32;
                (term.clone(), (1.0 + (n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        tracing::info!(
            "Built lexical index: {} documents, {} terms, avg length {:.1}",
            doc_ids.len(),
            postings.len(),
            avg_doc_length
        );

        Ok(Self {
            postings,
            idf,
            doc_ids,
            doc_lengths,
            avg_doc_length,
            params,
        })
    }

    /// Rank documents against pre-tokenized query terms.
    ///
    /// Only documents matching at least one term are returned. Ties are broken
    /// by document id ascending; at most `k` hits come back.
    pub fn search(&self, query_tokens: &[String], k: usize) -> Vec<RankedHit> {
        if k == 0 || query_tokens.is_empty() || self.doc_ids.is_empty() {
            return Vec::new();
        }

        let Bm25Params { k1, b } = self.params;
        let mut scores: AHashMap<u32, f32> = AHashMap::new();

        for token in query_tokens {
            let (Some(list), Some(&idf)) = (self.postings.get(token), self.idf.get(token)) else {
                continue;
            };

            for posting in list {
                let tf = posting.tf as f32;
                let dl = self.doc_lengths[posting.doc as usize] as f32;
                let norm = tf + k1 * (1.0 - b + b * dl / self.avg_doc_length);
                *scores.entry(posting.doc).or_insert(0.0) += idf * (tf * (k1 + 1.0)) / norm;
            }
        }

        let scored = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc, score)| (self.doc_ids[doc as usize].clone(), score))
            .collect();

        rank_hits(scored, k)
    }

    /// Tokenize `query` with the index tokenizer and search.
    pub fn search_text(&self, query: &str, k: usize) -> Vec<RankedHit> {
        self.search(&tokenize(query), k)
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Number of distinct terms
    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }

    pub fn average_doc_length(&self) -> f32 {
        self.avg_doc_length
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    /// Cached IDF for `term`, if the term occurs in the corpus
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.idf.get(term).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SourceMetadata;

    fn doc(id: &str, text: &str) -> Document {
        Document::new(id, text, SourceMetadata::default())
    }

    fn build_corpus() -> LexicalIndex {
        let docs = vec![
            doc("ev-1", "Electric vehicle policy grants road tax exemption"),
            doc("ev-2", "Charging stations for electric vehicle owners"),
            doc("ex-1", "Excise policy sets liquor license fee"),
            doc("ind-1", "Industrial policy incentives for new units"),
        ];
        LexicalIndex::build(&docs, Bm25Params::default()).unwrap()
    }

    #[test]
    fn test_build_empty_fails() {
        let err = LexicalIndex::build(&[], Bm25Params::default()).unwrap_err();
        assert_eq!(err, IndexBuildError::EmptyCorpus);
    }

    #[test]
    fn test_build_rejects_duplicate_ids() {
        let docs = vec![doc("a", "one"), doc("a", "two")];
        let err = LexicalIndex::build(&docs, Bm25Params::default()).unwrap_err();
        assert_eq!(
            err,
            IndexBuildError::DuplicateDocument {
                id: "a".to_string()
            }
        );
    }

    #[test]
    fn test_build_rejects_blank_id() {
        let docs = vec![doc("a", "one"), doc("  ", "two")];
        let err = LexicalIndex::build(&docs, Bm25Params::default()).unwrap_err();
        assert_eq!(err, IndexBuildError::EmptyDocumentId { position: 1 });
    }

    #[test]
    fn test_finds_matching_docs_only() {
        let index = build_corpus();
        let hits = index.search_text("electric vehicle", 10);

        let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"ev-1"));
        assert!(ids.contains(&"ev-2"));
        assert!(hits.iter().all(|h| h.score > 0.0));
    }

    #[test]
    fn test_no_match_returns_empty() {
        let index = build_corpus();
        assert!(index.search_text("helicopter", 10).is_empty());
        assert!(index.search(&[], 10).is_empty());
        assert!(index.search_text("policy", 0).is_empty());
    }

    #[test]
    fn test_ranks_are_one_based_and_truncated() {
        let index = build_corpus();
        let hits = index.search_text("policy", 2);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_higher_tf_ranks_first() {
        let docs = vec![
            doc("b", "parking parking parking"),
            doc("a", "parking permit"),
        ];
        let index = LexicalIndex::build(&docs, Bm25Params::default()).unwrap();
        let hits = index.search_text("parking", 10);
        assert_eq!(hits[0].doc_id, "b");
    }

    #[test]
    fn test_ties_broken_by_doc_id() {
        let docs = vec![
            doc("zeta", "waste segregation rules"),
            doc("alpha", "waste segregation rules"),
            doc("mid", "unrelated text entirely"),
        ];
        let index = LexicalIndex::build(&docs, Bm25Params::default()).unwrap();
        let hits = index.search_text("waste", 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, hits[1].score);
        assert_eq!(hits[0].doc_id, "alpha");
        assert_eq!(hits[1].doc_id, "zeta");
    }

    #[test]
    fn test_idf_cached_and_positive() {
        let index = build_corpus();
        let common = index.idf("policy").unwrap();
        let rare = index.idf("excise").unwrap();
        assert!(common > 0.0);
        assert!(rare > common);
        assert!(index.idf("missing").is_none());
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_bm25_formula_single_term() {
        let docs = vec![doc("a", "fee fee permit"), doc("b", "license")];
        let index = LexicalIndex::build(&docs, Bm25Params::default()).unwrap();
        let hits = index.search_text("fee", 10);

        let (k1, b) = (1.5_f32, 0.75_f32);
        let n = 2.0_f32;
        let df = 1.0_f32;
        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
        let avgdl = (3.0 + 1.0) / 2.0;
        let tf = 2.0_f32;
        let expected = idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * 3.0 / avgdl));

        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_bm25_params_validation() {
        assert!(Bm25Params::new(1.2, 0.75).is_ok());
        assert!(Bm25Params::new(-1.0, 0.75).is_err());
        assert!(Bm25Params::new(1.2, 1.5).is_err());
    }
}
