//! Weighted Reciprocal Rank Fusion of the lexical and vector rankings

use super::types::{FusedResult, RankedHit};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conventional RRF constant from Cormack et al. (SIGIR 2009)
pub const DEFAULT_RRF_K: f64 = 60.0;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("Invalid weight configuration: {0}")]
    InvalidWeights(String),

    #[error("RRF constant must be a positive finite number, got {0}")]
    InvalidRrfConstant(f64),

    #[error("Invalid {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },
}

/// Relative contribution of each retrieval path. Always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector: f64,
    pub lexical: f64,
}

impl FusionWeights {
    pub fn new(vector: f64, lexical: f64) -> Result<Self, FusionError> {
        for (name, weight) in [("vector", vector), ("lexical", lexical)] {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(FusionError::InvalidWeights(format!(
                    "{} weight must be within [0, 1], got {}",
                    name, weight
                )));
            }
        }

        if (vector + lexical - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(FusionError::InvalidWeights(format!(
                "weights must sum to 1.0, got {} + {} = {}",
                vector,
                lexical,
                vector + lexical
            )));
        }

        Ok(Self { vector, lexical })
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector: 0.5,
            lexical: 0.5,
        }
    }
}

/// Configuration for fusion algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// RRF constant `c` in `1 / (c + rank)`
    pub rrf_k: f64,
    pub weights: FusionWeights,
}

impl FusionConfig {
    pub fn new(rrf_k: f64, vector_weight: f64, lexical_weight: f64) -> Result<Self, FusionError> {
        if !rrf_k.is_finite() || rrf_k <= 0.0 {
            return Err(FusionError::InvalidRrfConstant(rrf_k));
        }

        Ok(Self {
            rrf_k,
            weights: FusionWeights::new(vector_weight, lexical_weight)?,
        })
    }

    /// Reciprocal-rank contribution of a 1-based rank
    pub fn rrf(&self, rank: usize) -> f64 {
        1.0 / (self.rrf_k + rank as f64)
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            weights: FusionWeights::default(),
        }
    }
}

/// Fuse two rankings into at most `k` results.
///
/// For every document in either list:
/// `score = w_vector * 1/(c + rank_vector) + w_lexical * 1/(c + rank_lexical)`,
/// where a missing rank contributes zero. Output follows
/// [`FusedResult::fused_order`]. `k` truncates the output only.
pub fn reciprocal_rank_fusion(
    lexical_hits: &[RankedHit],
    vector_hits: &[RankedHit],
    k: usize,
    config: &FusionConfig,
) -> Vec<FusedResult> {
    if k == 0 {
        return Vec::new();
    }

    // doc_id -> (lexical rank, vector rank); keep the best rank on repeats
    let mut ranks: AHashMap<&str, (Option<usize>, Option<usize>)> =
        AHashMap::with_capacity(lexical_hits.len() + vector_hits.len());

    for hit in lexical_hits {
        let slot = &mut ranks.entry(hit.doc_id.as_str()).or_default().0;
        *slot = Some(slot.map_or(hit.rank, |r| r.min(hit.rank)));
    }

    for hit in vector_hits {
        let slot = &mut ranks.entry(hit.doc_id.as_str()).or_default().1;
        *slot = Some(slot.map_or(hit.rank, |r| r.min(hit.rank)));
    }

    let weights = config.weights;
    let mut fused: Vec<FusedResult> = ranks
        .into_iter()
        .map(|(doc_id, (lexical_rank, vector_rank))| {
            let vector = vector_rank.map_or(0.0, |r| weights.vector * config.rrf(r));
            let lexical = lexical_rank.map_or(0.0, |r| weights.lexical * config.rrf(r));
            FusedResult {
                doc_id: doc_id.to_string(),
                score: vector + lexical,
                lexical_rank,
                vector_rank,
            }
        })
        .collect();

    fused.sort_by(FusedResult::fused_order);
    fused.truncate(k);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(ids: &[&str]) -> Vec<RankedHit> {
        ids.iter()
            .enumerate()
            .map(|(pos, id)| RankedHit {
                doc_id: id.to_string(),
                score: 1.0 - pos as f32 * 0.1,
                rank: pos + 1,
            })
            .collect()
    }

    fn ids(results: &[FusedResult]) -> Vec<&str> {
        results.iter().map(|r| r.doc_id.as_str()).collect()
    }

    #[test]
    fn test_rrf_overlap_scenario() {
        let lexical = hits(&["docA", "docB"]);
        let vector = hits(&["docB", "docC"]);
        let config = FusionConfig::new(60.0, 0.5, 0.5).unwrap();

        let fused = reciprocal_rank_fusion(&lexical, &vector, 3, &config);

        assert_eq!(ids(&fused), vec!["docB", "docA", "docC"]);
        assert_eq!(fused[0].score, 0.5 * (1.0 / 61.0) + 0.5 * (1.0 / 62.0));
        assert_eq!(fused[0].lexical_rank, Some(2));
        assert_eq!(fused[0].vector_rank, Some(1));

        // docA: lexical rank 1 only; docC: vector rank 2 only
        assert_eq!(fused[1].score, 0.5 * (1.0 / 61.0));
        assert_eq!(fused[2].score, 0.5 * (1.0 / 62.0));
        assert!(!fused[1].in_both() && !fused[2].in_both());
    }

    #[test]
    fn test_rrf_both_empty() {
        let config = FusionConfig::default();
        for k in [0, 1, 10] {
            assert!(reciprocal_rank_fusion(&[], &[], k, &config).is_empty());
        }
        let skewed = FusionConfig::new(10.0, 0.9, 0.1).unwrap();
        assert!(reciprocal_rank_fusion(&[], &[], 5, &skewed).is_empty());
    }

    #[test]
    fn test_rrf_single_list_preserves_order() {
        let lexical = hits(&["x", "y", "z"]);
        let fused = reciprocal_rank_fusion(&lexical, &[], 10, &FusionConfig::default());

        assert_eq!(ids(&fused), vec!["x", "y", "z"]);
        assert!(fused.iter().all(|r| r.vector_rank.is_none()));
    }

    #[test]
    fn test_rrf_disjoint_lists_single_source() {
        let lexical = hits(&["a", "b", "c"]);
        let vector = hits(&["d", "e"]);
        let fused = reciprocal_rank_fusion(&lexical, &vector, 10, &FusionConfig::default());

        assert_eq!(fused.len(), 5);
        for result in &fused {
            assert!(result.lexical_rank.is_some() ^ result.vector_rank.is_some());
            assert!(!result.in_both());
        }
    }

    #[test]
    fn test_rrf_output_length_is_min_of_k_and_union() {
        let lexical = hits(&["a", "b", "c"]);
        let vector = hits(&["c", "d"]);
        let config = FusionConfig::default();

        // union = {a, b, c, d}
        for k in 0..7 {
            let fused = reciprocal_rank_fusion(&lexical, &vector, k, &config);
            assert_eq!(fused.len(), k.min(4));
        }
    }

    #[test]
    fn test_rrf_deterministic() {
        let lexical = hits(&["p", "q", "r", "s", "t"]);
        let vector = hits(&["t", "s", "x", "p", "y"]);
        let config = FusionConfig::new(60.0, 0.5, 0.5).unwrap();

        let first = reciprocal_rank_fusion(&lexical, &vector, 4, &config);
        for _ in 0..20 {
            assert_eq!(reciprocal_rank_fusion(&lexical, &vector, 4, &config), first);
        }
    }

    #[test]
    fn test_rrf_weighted() {
        let lexical = hits(&["lex"]);
        let vector = hits(&["vec"]);

        let prefer_vector = FusionConfig::new(60.0, 0.7, 0.3).unwrap();
        let fused = reciprocal_rank_fusion(&lexical, &vector, 2, &prefer_vector);
        assert_eq!(fused[0].doc_id, "vec");

        let prefer_lexical = FusionConfig::new(60.0, 0.3, 0.7).unwrap();
        let fused = reciprocal_rank_fusion(&lexical, &vector, 2, &prefer_lexical);
        assert_eq!(fused[0].doc_id, "lex");
    }

    #[test]
    fn test_rrf_zero_weight_keeps_documents() {
        let lexical = hits(&["a"]);
        let vector = hits(&["b"]);
        let config = FusionConfig::new(60.0, 0.0, 1.0).unwrap();

        let fused = reciprocal_rank_fusion(&lexical, &vector, 10, &config);
        assert_eq!(ids(&fused), vec!["a", "b"]);
        assert_eq!(fused[1].score, 0.0);
    }

    #[test]
    fn test_rrf_presence_in_both_wins_exact_tie() {
        let hit = |id: &str, rank: usize| RankedHit {
            doc_id: id.to_string(),
            score: 1.0,
            rank,
        };
        // 0.5/(60+62) + 0.5/(60+62) == 0.5/(60+1) exactly
        let lexical = vec![hit("zz-both", 62)];
        let vector = vec![hit("aa-solo", 1), hit("zz-both", 62)];

        let fused = reciprocal_rank_fusion(&lexical, &vector, 10, &FusionConfig::default());

        assert_eq!(fused[0].score, fused[1].score);
        assert_eq!(ids(&fused), vec!["zz-both", "aa-solo"]);
    }

    #[test]
    fn test_fusion_config_validation() {
        assert!(FusionConfig::new(60.0, 0.5, 0.5).is_ok());
        assert!(FusionConfig::new(60.0, 1.0, 0.0).is_ok());
        assert!(matches!(
            FusionConfig::new(60.0, 0.6, 0.6),
            Err(FusionError::InvalidWeights(_))
        ));
        assert!(matches!(
            FusionConfig::new(60.0, -0.5, 1.5),
            Err(FusionError::InvalidWeights(_))
        ));
        assert!(matches!(
            FusionConfig::new(0.0, 0.5, 0.5),
            Err(FusionError::InvalidRrfConstant(_))
        ));
        assert!(matches!(
            FusionConfig::new(f64::NAN, 0.5, 0.5),
            Err(FusionError::InvalidRrfConstant(_))
        ));
    }
}
