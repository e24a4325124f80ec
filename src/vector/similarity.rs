use anyhow::Result;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::common::StageOutcome;
use crate::similarity::SimilarityMatrix;
use crate::vector::{embedding::EmbeddingService, TARGET_VECTOR};

/// Calculate cosine similarity directly between two vectors
///
/// # Arguments
/// * `vec1` - First vector
/// * `vec2` - Second vector
///
/// # Returns
/// * `Result<f32>` - The cosine similarity or an error
pub fn calculate_direct_similarity(vec1: &[f32], vec2: &[f32]) -> Result<f32> {
    if vec1.len() != vec2.len() {
        return Err(anyhow::anyhow!(
            "Vector dimensions don't match: {} vs {}",
            vec1.len(),
            vec2.len()
        ));
    }

    let mag1: f32 = vec1.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag2: f32 = vec2.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag1 < 0.001 || mag2 < 0.001 {
        return Err(anyhow::anyhow!("Zero magnitude vector detected"));
    }

    let dot_product: f32 = vec1.iter().zip(vec2.iter()).map(|(a, b)| a * b).sum();
    let similarity = dot_product / (mag1 * mag2);

    Ok(similarity.clamp(-1.0, 1.0))
}

/// Pairwise cosine similarity of embeddings.
///
/// A zero-magnitude embedding is treated as unrelated to everything else;
/// mismatched dimensions are an error.
pub fn embedding_similarity_matrix(embeddings: &[Vec<f32>]) -> Result<SimilarityMatrix> {
    if let Some(first) = embeddings.first() {
        if let Some(bad) = embeddings.iter().find(|e| e.len() != first.len()) {
            return Err(anyhow::anyhow!(
                "Vector dimensions don't match: {} vs {}",
                first.len(),
                bad.len()
            ));
        }
    }

    Ok(SimilarityMatrix::from_pairwise(embeddings.len(), |i, j| {
        calculate_direct_similarity(&embeddings[i], &embeddings[j]).unwrap_or(0.0)
    }))
}

/// Semantic similarity stage.
///
/// Any load or inference failure degrades to "no semantic signal"; the batch
/// continues with lexical similarity alone.
pub fn calculate_semantic_similarity(
    texts: &[String],
    service: &EmbeddingService,
) -> StageOutcome<SimilarityMatrix> {
    let Some(encoder) = service.encoder() else {
        warn!(target: TARGET_VECTOR, "Embedding model unavailable; using TF-IDF similarity only");
        return StageOutcome::degraded("embedding model unavailable");
    };

    let start = Instant::now();
    let embeddings = match encoder.encode(texts) {
        Ok(embeddings) => embeddings,
        Err(e) => {
            error!(target: TARGET_VECTOR, "Semantic similarity calculation failed: {:#}", e);
            return StageOutcome::degraded(e);
        }
    };
    if embeddings.len() != texts.len() {
        error!(target: TARGET_VECTOR,
            "Encoder returned {} embeddings for {} texts",
            embeddings.len(),
            texts.len()
        );
        return StageOutcome::degraded("embedding count mismatch");
    }

    match embedding_similarity_matrix(&embeddings) {
        Ok(matrix) => {
            info!(target: TARGET_VECTOR,
                "Semantic similarity computed for {} articles in {:?} (device: {})",
                texts.len(),
                start.elapsed(),
                encoder.device_label()
            );
            StageOutcome::Ok(matrix)
        }
        Err(e) => {
            error!(target: TARGET_VECTOR, "Semantic similarity calculation failed: {:#}", e);
            StageOutcome::degraded(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::embedding::SentenceEncoder;
    use std::sync::Arc;

    struct KeywordEncoder;

    impl SentenceEncoder for KeywordEncoder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("rates") {
                        vec![1.0, 0.1]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    struct BrokenEncoder;

    impl SentenceEncoder for BrokenEncoder {
        fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(anyhow::anyhow!("device lost"))
        }
    }

    #[test]
    fn test_calculate_direct_similarity() {
        assert!((calculate_direct_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(calculate_direct_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert!(calculate_direct_similarity(&[1.0], &[1.0, 0.0]).is_err());
        assert!(calculate_direct_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_zero_embedding_is_unrelated() {
        let m = embedding_similarity_matrix(&[vec![0.0, 0.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(0, 0), 1.0);
        assert!(embedding_similarity_matrix(&[vec![1.0], vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_semantic_stage_with_encoder() {
        let service = EmbeddingService::with_encoder(Arc::new(KeywordEncoder));
        let texts = vec![
            "fed raises rates".to_string(),
            "central bank lifts rates".to_string(),
            "new phone released".to_string(),
        ];
        let matrix = calculate_semantic_similarity(&texts, &service).ok().unwrap();
        assert!(matrix.get(0, 1) > 0.99);
        assert!(matrix.get(0, 2) < 0.2);
    }

    #[test]
    fn test_semantic_stage_degrades_on_failure() {
        let service = EmbeddingService::with_encoder(Arc::new(BrokenEncoder));
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(calculate_semantic_similarity(&texts, &service).is_degraded());
    }
}
