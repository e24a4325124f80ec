use anyhow::Result;
use tracing::{info, warn};

use super::matrix::SimilarityMatrix;
use super::TARGET_SIMILARITY;

/// Renormalizes the lexical/semantic weights so they sum to one.
///
/// Negative weights count as zero. Returns `None` when nothing positive is left.
pub fn normalize_weights(lexical: f32, semantic: f32) -> Option<(f32, f32)> {
    let lexical = if lexical.is_finite() { lexical.max(0.0) } else { 0.0 };
    let semantic = if semantic.is_finite() { semantic.max(0.0) } else { 0.0 };
    let total = lexical + semantic;
    if total <= 0.0 {
        return None;
    }
    Some((lexical / total, semantic / total))
}

/// Weighted combination of the lexical matrix and, when present, the semantic one.
///
/// Without a semantic matrix the lexical matrix is returned unchanged, as it is
/// when the weights cannot be normalized.
pub fn combine_similarity_matrices(
    lexical: SimilarityMatrix,
    semantic: Option<&SimilarityMatrix>,
    lexical_weight: f32,
    semantic_weight: f32,
) -> Result<SimilarityMatrix> {
    let Some(semantic) = semantic else {
        info!(target: TARGET_SIMILARITY, "No semantic similarity; using TF-IDF only");
        return Ok(lexical);
    };

    let Some((w_l, w_s)) = normalize_weights(lexical_weight, semantic_weight) else {
        warn!(target: TARGET_SIMILARITY,
            "Fusion weights {} / {} have no positive total; using TF-IDF only",
            lexical_weight,
            semantic_weight
        );
        return Ok(lexical);
    };

    let fused = lexical.weighted_sum(w_l, semantic, w_s)?;
    info!(target: TARGET_SIMILARITY,
        "Similarity matrices combined (TF-IDF: {:.2}, semantic: {:.2})",
        w_l,
        w_s
    );
    Ok(fused)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_weights() {
        assert_eq!(normalize_weights(1.5, 0.5), Some((0.75, 0.25)));
        assert_eq!(normalize_weights(3.0, 1.0), Some((0.75, 0.25)));
        assert_eq!(normalize_weights(-1.0, 2.0), Some((0.0, 1.0)));
        assert_eq!(normalize_weights(0.0, 0.0), None);
        assert_eq!(normalize_weights(f32::NAN, 1.0), Some((0.0, 1.0)));
    }

    #[test]
    fn test_lexical_passthrough_without_semantic() {
        let lexical = SimilarityMatrix::from_pairwise(3, |_, _| 0.3);
        let fused = combine_similarity_matrices(lexical.clone(), None, 0.6, 0.4).unwrap();
        assert_eq!(fused, lexical);
    }

    #[test]
    fn test_weights_are_renormalized() {
        let lexical = SimilarityMatrix::from_pairwise(2, |_, _| 0.2);
        let semantic = SimilarityMatrix::from_pairwise(2, |_, _| 1.0);
        // 6:4 and 3:2 describe the same mix
        let a = combine_similarity_matrices(lexical.clone(), Some(&semantic), 6.0, 4.0).unwrap();
        let b = combine_similarity_matrices(lexical, Some(&semantic), 0.3, 0.2).unwrap();
        assert!((a.get(0, 1) - 0.52).abs() < 1e-6);
        assert!((a.get(0, 1) - b.get(0, 1)).abs() < 1e-6);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let lexical = SimilarityMatrix::identity(2);
        let semantic = SimilarityMatrix::identity(3);
        assert!(combine_similarity_matrices(lexical, Some(&semantic), 0.6, 0.4).is_err());
    }
}
