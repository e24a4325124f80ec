//! Lexical similarity, the semantic gate and similarity fusion.

pub mod fusion;
pub mod matrix;
pub mod tfidf;

pub use fusion::{combine_similarity_matrices, normalize_weights};
pub use matrix::SimilarityMatrix;
pub use tfidf::{calculate_tfidf_similarity, TfidfConfig};

pub const TARGET_SIMILARITY: &str = "similarity";

/// Default lexical score above which the semantic stage is worth running.
pub const DEFAULT_SEMANTIC_GATE_THRESHOLD: f32 = 0.6;

/// Decides whether any pair is lexically close enough to justify computing
/// semantic similarity for the batch.
pub fn has_semantic_candidates(lexical: &SimilarityMatrix, gate_threshold: f32) -> bool {
    lexical.any_pair_above(gate_threshold)
}
