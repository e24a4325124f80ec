use serde::Serialize;
use std::time::Duration;
use tracing::info;

use crate::article::DedupedArticle;
use crate::clustering::ClusteringMethod;
use crate::dedup::TARGET_DEDUP;

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub lexical_ms: f64,
    pub semantic_ms: f64,
    pub clustering_ms: f64,
    pub total_ms: f64,
}

pub(crate) fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Numbers describing one run of the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DedupStats {
    pub input_count: usize,
    /// Canonical articles left after the link/hash pre-merge.
    pub unique_after_hash: usize,
    pub hash_collapsed: usize,
    pub result_count: usize,
    /// Share of the input that did not make it into the output as a representative.
    pub reduction_rate: f64,
    pub cluster_count: usize,
    pub average_cluster_size: f64,
    /// Sum of the cluster sizes; equals `unique_after_hash` on a completed run.
    pub clustered_articles: usize,
    pub tfidf_pairs_above_threshold: usize,
    pub bert_pairs_above_threshold: usize,
    pub semantic_used: bool,
    pub clustering_method: Option<ClusteringMethod>,
    pub timings: StageTimings,
}

impl DedupStats {
    pub(crate) fn finish(&mut self, result_count: usize) {
        self.result_count = result_count;
        self.reduction_rate = if self.input_count == 0 {
            0.0
        } else {
            1.0 - result_count as f64 / self.input_count as f64
        };
    }

    pub fn log_summary(&self) {
        info!(target: TARGET_DEDUP,
            "Deduplication complete: {} -> {} articles (reduction {:.1}%, {} clusters, avg size {:.2})",
            self.input_count,
            self.result_count,
            self.reduction_rate * 100.0,
            self.cluster_count,
            self.average_cluster_size
        );
        info!(target: TARGET_DEDUP,
            "Hash pre-merge collapsed {}; pairs above threshold: TF-IDF {}, semantic {} (semantic used: {})",
            self.hash_collapsed,
            self.tfidf_pairs_above_threshold,
            self.bert_pairs_above_threshold,
            self.semantic_used
        );
        info!(target: TARGET_DEDUP,
            "Timings: lexical {:.1}ms, semantic {:.1}ms, clustering {:.1}ms, total {:.1}ms",
            self.timings.lexical_ms,
            self.timings.semantic_ms,
            self.timings.clustering_ms,
            self.timings.total_ms
        );
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    pub articles: Vec<DedupedArticle>,
    pub stats: DedupStats,
    /// Why the run fell back to the degraded path, if it did.
    pub degraded: Option<String>,
}

impl DedupReport {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}
