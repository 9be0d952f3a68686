//! Weighted blend of a fast-tier and quality-tier [`FusedHit`] list into one
//! re-ranked list.

use std::collections::HashMap;

use crate::fusion::{sort_by_shared_key, FusedHit};

/// Blend fast-tier and quality-tier RRF scores.
///
/// For a document in both lists: `score' = w * quality_rrf + (1-w) * fast_rrf`.
/// For a document in only one list, the missing contribution is treated as 0.
/// Metadata (`lexical_rank`, `semantic_rank`, raw scores, `in_both_sources`)
/// is copied from the quality hit if present, else the fast hit — the
/// re-embedded phase reflects what the caller will display next to the
/// blended score, so it must be internally consistent.
///
/// Re-sorted by the same 4-level tie-break key RRF uses, applied to the
/// blended score.
#[must_use]
pub fn blend(fast: &[FusedHit], quality: &[FusedHit], quality_weight: f64) -> Vec<FusedHit> {
    let fast_weight = 1.0 - quality_weight;

    let fast_by_id: HashMap<&str, &FusedHit> =
        fast.iter().map(|hit| (hit.doc_id.as_str(), hit)).collect();
    let quality_by_id: HashMap<&str, &FusedHit> =
        quality.iter().map(|hit| (hit.doc_id.as_str(), hit)).collect();

    let mut doc_ids: Vec<&str> = fast_by_id.keys().chain(quality_by_id.keys()).copied().collect();
    doc_ids.sort_unstable();
    doc_ids.dedup();

    let mut blended: Vec<FusedHit> = doc_ids
        .into_iter()
        .map(|doc_id| {
            let fast_hit = fast_by_id.get(doc_id).copied();
            let quality_hit = quality_by_id.get(doc_id).copied();
            blend_single(doc_id, fast_hit, quality_hit, quality_weight, fast_weight)
        })
        .collect();

    sort_by_shared_key(&mut blended);
    blended
}

fn blend_single(
    doc_id: &str,
    fast_hit: Option<&FusedHit>,
    quality_hit: Option<&FusedHit>,
    quality_weight: f64,
    fast_weight: f64,
) -> FusedHit {
    let fast_score = fast_hit.map_or(0.0, |h| h.rrf_score);
    let quality_score = quality_hit.map_or(0.0, |h| h.rrf_score);
    let score = quality_weight * quality_score + fast_weight * fast_score;

    let reference = quality_hit.or(fast_hit).expect("blend_single called with no hits for doc_id");

    FusedHit {
        doc_id: doc_id.to_string(),
        rrf_score: score,
        lexical_rank: reference.lexical_rank,
        semantic_rank: reference.semantic_rank,
        lexical_score: reference.lexical_score,
        semantic_score: reference.semantic_score,
        in_both_sources: reference.in_both_sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(doc_id: &str, rrf_score: f64) -> FusedHit {
        FusedHit {
            doc_id: doc_id.to_string(),
            rrf_score,
            lexical_rank: None,
            semantic_rank: None,
            lexical_score: None,
            semantic_score: None,
            in_both_sources: false,
        }
    }

    #[test]
    fn blend_math_scenario() {
        let fast = vec![hit("a", 1.0), hit("b", 0.5)];
        let quality = vec![hit("a", 0.8), hit("c", 0.9)];
        let blended = blend(&fast, &quality, 0.7);

        let by_id: HashMap<&str, &FusedHit> =
            blended.iter().map(|h| (h.doc_id.as_str(), h)).collect();
        assert!((by_id["a"].rrf_score - 0.86).abs() < 1e-9);
        assert!((by_id["b"].rrf_score - 0.15).abs() < 1e-9);
        assert!((by_id["c"].rrf_score - 0.63).abs() < 1e-9);
    }

    #[test]
    fn metadata_prefers_quality_hit() {
        let fast_hit = FusedHit {
            lexical_score: Some(1.0),
            ..hit("a", 1.0)
        };
        let quality_hit = FusedHit {
            lexical_score: Some(9.0),
            ..hit("a", 1.0)
        };
        let blended = blend(&[fast_hit], &[quality_hit], 0.7);
        assert_eq!(blended[0].lexical_score, Some(9.0));
    }

    #[test]
    fn metadata_falls_back_to_fast_hit_when_quality_absent() {
        let fast_hit = FusedHit {
            lexical_score: Some(4.0),
            ..hit("a", 1.0)
        };
        let blended = blend(&[fast_hit], &[], 0.7);
        assert_eq!(blended[0].lexical_score, Some(4.0));
    }

    #[test]
    fn result_sorted_by_blended_score_descending() {
        let fast = vec![hit("a", 0.1), hit("b", 0.9)];
        let quality = vec![];
        let blended = blend(&fast, &quality, 0.7);
        assert_eq!(blended[0].doc_id, "b");
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        assert!(blend(&[], &[], 0.7).is_empty());
    }
}
