//! Ranked and fused result records

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One hit from a single retrieval path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    pub doc_id: String,
    /// Raw path-specific score (BM25 or similarity); not comparable across paths
    pub score: f32,
    /// 1-based rank within the path
    pub rank: usize,
}

/// One document in the fused ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub doc_id: String,
    pub score: f64,
    /// Rank in the lexical list, if the document appeared there
    pub lexical_rank: Option<usize>,
    /// Rank in the vector list, if the document appeared there
    pub vector_rank: Option<usize>,
}

impl FusedResult {
    /// Whether both retrieval paths returned this document
    pub fn in_both(&self) -> bool {
        self.lexical_rank.is_some() && self.vector_rank.is_some()
    }

    /// Total order over fused results: score descending, then documents found
    /// by both paths first, then document id ascending.
    pub fn fused_order(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.in_both().cmp(&self.in_both()))
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Turn `(doc_id, raw_score)` pairs into at most `k` ranked hits.
///
/// Sorted by score descending with document id ascending on ties. If an id
/// occurs more than once only its best-scored occurrence is kept.
pub fn rank_hits(mut scored: Vec<(String, f32)>, k: usize) -> Vec<RankedHit> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut seen: AHashSet<String> = AHashSet::with_capacity(scored.len());
    scored
        .into_iter()
        .filter(|(id, _)| seen.insert(id.clone()))
        .take(k)
        .enumerate()
        .map(|(pos, (doc_id, score))| RankedHit {
            doc_id,
            score,
            rank: pos + 1,
        })
        .collect()
}
