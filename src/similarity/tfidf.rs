use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{error, info};

use super::matrix::SimilarityMatrix;
use super::TARGET_SIMILARITY;
use crate::common::StageOutcome;

lazy_static! {
    // Words of two or more characters
    static ref TOKEN: Regex = Regex::new(r"\b\w\w+\b").unwrap();
}

/// Vectorizer limits that keep the vocabulary bounded on large batches.
#[derive(Debug, Clone)]
pub struct TfidfConfig {
    pub max_features: usize,
    pub min_df: usize,
    /// Terms present in more than this fraction of documents are dropped.
    pub max_df: f32,
    pub ngram_range: (usize, usize),
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: 1500,
            min_df: 1,
            max_df: 0.95,
            ngram_range: (1, 2),
        }
    }
}

/// L2-normalized sparse document vector, sorted by term index.
pub type SparseVector = Vec<(usize, f32)>;

fn analyze(text: &str, (min_n, max_n): (usize, usize)) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN.find_iter(&lowered).map(|m| m.as_str()).collect();

    let mut terms = Vec::new();
    for n in min_n.max(1)..=max_n {
        if tokens.len() < n {
            break;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

/// Fits a TF-IDF model on `documents` and returns one normalized vector per document.
///
/// Uses smoothed idf, `ln((1 + n) / (1 + df)) + 1`. Fails when no term survives
/// the document-frequency bounds.
pub fn fit_transform(documents: &[String], config: &TfidfConfig) -> Result<Vec<SparseVector>> {
    let n_docs = documents.len();
    if n_docs == 0 {
        return Err(anyhow::anyhow!("No documents to vectorize"));
    }

    let counts: Vec<HashMap<String, usize>> = documents
        .iter()
        .map(|doc| {
            let mut tf = HashMap::new();
            for term in analyze(doc, config.ngram_range) {
                *tf.entry(term).or_insert(0) += 1;
            }
            tf
        })
        .collect();

    // term -> (document frequency, corpus frequency)
    let mut stats: HashMap<&str, (usize, usize)> = HashMap::new();
    for doc in &counts {
        for (term, &count) in doc {
            let entry = stats.entry(term.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += count;
        }
    }
    if stats.is_empty() {
        return Err(anyhow::anyhow!("Empty vocabulary; documents contain no terms"));
    }

    let max_doc_count = config.max_df * n_docs as f32;
    if max_doc_count < config.min_df as f32 {
        return Err(anyhow::anyhow!("max_df corresponds to fewer documents than min_df"));
    }

    let mut kept: Vec<(&str, usize, usize)> = stats
        .iter()
        .filter(|(_, &(df, _))| df >= config.min_df && df as f32 <= max_doc_count)
        .map(|(&term, &(df, cf))| (term, df, cf))
        .collect();
    if kept.is_empty() {
        return Err(anyhow::anyhow!("After pruning, no terms remain"));
    }

    if kept.len() > config.max_features {
        kept.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
        kept.truncate(config.max_features);
    }

    // Vocabulary indices follow term order
    let vocabulary: BTreeMap<&str, f32> = kept
        .iter()
        .map(|&(term, df, _)| {
            let idf = ((1.0 + n_docs as f32) / (1.0 + df as f32)).ln() + 1.0;
            (term, idf)
        })
        .collect();
    let index: HashMap<&str, (usize, f32)> = vocabulary
        .iter()
        .enumerate()
        .map(|(i, (&term, &idf))| (term, (i, idf)))
        .collect();

    let vectors = counts
        .iter()
        .map(|doc| {
            let mut vector: SparseVector = doc
                .iter()
                .filter_map(|(term, &count)| {
                    index
                        .get(term.as_str())
                        .map(|&(i, idf)| (i, count as f32 * idf))
                })
                .collect();
            vector.sort_by_key(|&(i, _)| i);

            let norm = vector.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
            if norm > 0.0 {
                for (_, w) in vector.iter_mut() {
                    *w /= norm;
                }
            }
            vector
        })
        .collect();

    Ok(vectors)
}

/// Dot product of two sorted sparse vectors.
pub fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

/// Pairwise cosine similarity of the TF-IDF vectors of `texts`.
pub fn tfidf_similarity(texts: &[String], config: &TfidfConfig) -> Result<SimilarityMatrix> {
    let vectors = fit_transform(texts, config)?;
    Ok(SimilarityMatrix::from_pairwise(vectors.len(), |i, j| {
        sparse_dot(&vectors[i], &vectors[j]).clamp(0.0, 1.0)
    }))
}

/// Lexical similarity stage. Degrades instead of failing; the caller falls back
/// to the identity matrix.
pub fn calculate_tfidf_similarity(
    texts: &[String],
    config: &TfidfConfig,
) -> StageOutcome<SimilarityMatrix> {
    let start = Instant::now();
    match tfidf_similarity(texts, config) {
        Ok(matrix) => {
            info!(target: TARGET_SIMILARITY,
                "TF-IDF similarity computed for {} articles in {:?}",
                texts.len(),
                start.elapsed()
            );
            StageOutcome::Ok(matrix)
        }
        Err(e) => {
            error!(target: TARGET_SIMILARITY, "TF-IDF calculation failed: {:#}", e);
            StageOutcome::degraded(e)
        }
    }
}
