use serde::{Deserialize, Serialize};

use crate::clustering::DEFAULT_SIMILARITY_THRESHOLD;
use crate::environment::{get_env_var_as_bool, get_env_var_or};
use crate::similarity::{TfidfConfig, DEFAULT_SEMANTIC_GATE_THRESHOLD};

/// Options recognized by the deduplication engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Fused similarity above which articles belong to the same story.
    pub similarity_threshold: f32,
    /// Cap on returned representatives; zero or negative disables the cap.
    pub max_results: i64,
    /// Toggles the semantic (embedding) similarity stage.
    pub enable_bert: bool,
    pub tfidf_weight: f32,
    pub bert_weight: f32,
    /// Longest allowed run of consecutive representatives from one source.
    pub max_same_source: usize,
    /// Lexical similarity a pair must exceed before semantic similarity is computed.
    pub semantic_gate_threshold: f32,
    /// Publication gap after which a same-source run starts over.
    pub diversity_reset_hours: f64,
    /// Derive a title+image `hash_key` for records that arrive without one.
    pub derive_hash_keys: bool,
    pub tfidf_max_features: usize,
    pub tfidf_min_df: usize,
    pub tfidf_max_df: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_results: 50,
            enable_bert: true,
            tfidf_weight: 0.6,
            bert_weight: 0.4,
            max_same_source: 3,
            semantic_gate_threshold: DEFAULT_SEMANTIC_GATE_THRESHOLD,
            diversity_reset_hours: 3.0,
            derive_hash_keys: false,
            tfidf_max_features: 1500,
            tfidf_min_df: 1,
            tfidf_max_df: 0.95,
        }
    }
}

impl DedupConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            similarity_threshold: get_env_var_or("SIMILARITY_THRESHOLD", d.similarity_threshold),
            max_results: get_env_var_or("MAX_RESULTS", d.max_results),
            enable_bert: get_env_var_as_bool("ENABLE_BERT", d.enable_bert),
            tfidf_weight: get_env_var_or("TFIDF_WEIGHT", d.tfidf_weight),
            bert_weight: get_env_var_or("BERT_WEIGHT", d.bert_weight),
            max_same_source: get_env_var_or("MAX_SAME_SOURCE", d.max_same_source),
            semantic_gate_threshold: get_env_var_or(
                "SEMANTIC_GATE_THRESHOLD",
                d.semantic_gate_threshold,
            ),
            diversity_reset_hours: get_env_var_or("DIVERSITY_RESET_HOURS", d.diversity_reset_hours),
            derive_hash_keys: get_env_var_as_bool("DERIVE_HASH_KEYS", d.derive_hash_keys),
            ..d
        }
    }

    /// Copy with every option forced into its valid range.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };

        Self {
            similarity_threshold: finite_or(self.similarity_threshold, d.similarity_threshold)
                .clamp(0.0, 1.0),
            tfidf_weight: finite_or(self.tfidf_weight, d.tfidf_weight).max(0.0),
            bert_weight: finite_or(self.bert_weight, d.bert_weight).max(0.0),
            max_same_source: self.max_same_source.max(1),
            semantic_gate_threshold: finite_or(self.semantic_gate_threshold, d.semantic_gate_threshold),
            diversity_reset_hours: if self.diversity_reset_hours.is_finite() {
                self.diversity_reset_hours.max(0.0)
            } else {
                d.diversity_reset_hours
            },
            tfidf_max_features: self.tfidf_max_features.max(1),
            tfidf_max_df: finite_or(self.tfidf_max_df, d.tfidf_max_df).clamp(0.0, 1.0),
            ..self.clone()
        }
    }

    /// Result cap, `None` when capping is disabled.
    pub fn result_cap(&self) -> Option<usize> {
        usize::try_from(self.max_results).ok().filter(|&cap| cap > 0)
    }

    pub fn tfidf(&self) -> TfidfConfig {
        TfidfConfig {
            max_features: self.tfidf_max_features,
            min_df: self.tfidf_min_df,
            max_df: self.tfidf_max_df,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DedupConfig::default();
        assert_eq!(config.similarity_threshold, 0.75);
        assert_eq!(config.max_results, 50);
        assert!(config.enable_bert);
        assert_eq!(config.max_same_source, 3);
        assert_eq!(config.result_cap(), Some(50));
    }

    #[test]
    fn test_result_cap_disabled() {
        for max_results in [0, -5] {
            let config = DedupConfig {
                max_results,
                ..Default::default()
            };
            assert_eq!(config.result_cap(), None);
        }
    }

    #[test]
    fn test_sanitized() {
        let config = DedupConfig {
            similarity_threshold: 1.7,
            tfidf_weight: -1.0,
            bert_weight: f32::NAN,
            max_same_source: 0,
            diversity_reset_hours: -2.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.similarity_threshold, 1.0);
        assert_eq!(config.tfidf_weight, 0.0);
        assert_eq!(config.bert_weight, 0.4);
        assert_eq!(config.max_same_source, 1);
        assert_eq!(config.diversity_reset_hours, 0.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DedupConfig =
            serde_json::from_str(r#"{"similarity_threshold": 0.8, "enable_bert": false}"#).unwrap();
        assert_eq!(config.similarity_threshold, 0.8);
        assert!(!config.enable_bert);
        assert_eq!(config.max_same_source, 3);
    }
}
