//! The deduplication pipeline: pre-merge, similarity, clustering, representative
//! selection, diversity and assembly over one batch of articles.

pub mod assembly;
pub mod config;
pub mod diversity;
pub mod premerge;
pub mod selection;
pub mod types;

pub use assembly::{assemble_results, assemble_single, build_related_articles, truncate_results};
pub use config::DedupConfig;
pub use diversity::{ensure_diversity, order_by_recency};
pub use premerge::{premerge_by_hash, PreMerge};
pub use selection::{information_density, select_representative, title_quality};
pub use types::{DedupReport, DedupStats, StageTimings};

use anyhow::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::article::{ingest_batch, prepare_text, Article, ArticleId, ArticleRecord, DedupedArticle};
use crate::clustering::{cluster_label, find_similar_groups, ClusterGroup, Partition};
use crate::similarity::{
    calculate_tfidf_similarity, combine_similarity_matrices, has_semantic_candidates,
    SimilarityMatrix,
};
use crate::vector::{calculate_semantic_similarity, EmbeddingService};
use selection::lookup;
use types::millis;

pub const TARGET_DEDUP: &str = "dedup";

/// Deduplication engine for batches of news articles.
///
/// Stateless between calls apart from the shared embedding service, so one
/// instance can serve any number of batches, concurrently if needed.
pub struct Deduplicator {
    config: DedupConfig,
    embeddings: Option<Arc<EmbeddingService>>,
}

impl Deduplicator {
    pub fn new(config: DedupConfig, embeddings: Option<Arc<EmbeddingService>>) -> Self {
        Self {
            config: config.sanitized(),
            embeddings,
        }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Deduplicated, diversified articles for the batch.
    pub fn deduplicate(&self, articles: &[ArticleRecord]) -> Vec<DedupedArticle> {
        self.run(articles).articles
    }

    /// Runs the pipeline and reports how it went.
    ///
    /// Never fails: an error or panic escaping the pipeline switches to the
    /// degraded path, a recency-sorted and capped passthrough of the input.
    pub fn run(&self, articles: &[ArticleRecord]) -> DedupReport {
        if articles.is_empty() {
            return DedupReport::default();
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(articles)));
        let reason = match outcome {
            Ok(Ok(report)) => return report,
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
        };

        error!(target: TARGET_DEDUP, "Deduplication failed: {}. Returning degraded result.", reason);
        let results = degraded_results(articles, &self.config);
        let mut stats = DedupStats {
            input_count: articles.len(),
            ..Default::default()
        };
        stats.finish(results.len());
        DedupReport {
            articles: results,
            stats,
            degraded: Some(reason),
        }
    }

    fn run_pipeline(&self, records: &[ArticleRecord]) -> Result<DedupReport> {
        let started = Instant::now();
        let config = &self.config;
        let mut stats = DedupStats {
            input_count: records.len(),
            ..Default::default()
        };

        let arena = ingest_batch(records, config.derive_hash_keys);
        let premerge = premerge_by_hash(&arena);
        stats.unique_after_hash = premerge.canonical.len();
        stats.hash_collapsed = premerge.collapsed_count();

        let articles = match premerge.canonical.as_slice() {
            [] => Vec::new(),
            [only] => {
                debug!(target: TARGET_DEDUP, "Single canonical article; skipping similarity stages");
                stats.cluster_count = 1;
                stats.average_cluster_size = 1.0;
                stats.clustered_articles = 1;
                vec![assemble_single(*only, &arena, &premerge)?]
            }
            ids => self.cluster_and_assemble(ids, &arena, &premerge, &mut stats)?,
        };

        stats.timings.total_ms = millis(started.elapsed());
        stats.finish(articles.len());
        stats.log_summary();
        Ok(DedupReport {
            articles,
            stats,
            degraded: None,
        })
    }

    fn cluster_and_assemble(
        &self,
        canonical: &[ArticleId],
        arena: &[Article],
        premerge: &PreMerge,
        stats: &mut DedupStats,
    ) -> Result<Vec<DedupedArticle>> {
        let config = &self.config;
        let texts = canonical
            .iter()
            .map(|&id| lookup(arena, id).map(|article| prepare_text(&article.record)))
            .collect::<Result<Vec<_>>>()?;

        let start = Instant::now();
        let lexical = calculate_tfidf_similarity(&texts, &config.tfidf()).unwrap_or_else(|reason| {
            warn!(target: TARGET_DEDUP,
                "Lexical similarity unavailable ({}); no articles will be merged by similarity",
                reason
            );
            SimilarityMatrix::identity(texts.len())
        });
        stats.timings.lexical_ms = millis(start.elapsed());
        stats.tfidf_pairs_above_threshold = lexical.pairs_above(config.similarity_threshold);

        let start = Instant::now();
        let semantic = self.semantic_similarity(&texts, &lexical);
        stats.timings.semantic_ms = millis(start.elapsed());
        if let Some(semantic) = &semantic {
            stats.semantic_used = true;
            stats.bert_pairs_above_threshold = semantic.pairs_above(config.similarity_threshold);
        }

        let fused = combine_similarity_matrices(
            lexical,
            semantic.as_ref(),
            config.tfidf_weight,
            config.bert_weight,
        )?;

        let start = Instant::now();
        let partition = find_similar_groups(&fused, config.similarity_threshold);
        let clusters = build_clusters(&partition, canonical, arena)?;
        stats.timings.clustering_ms = millis(start.elapsed());
        stats.clustering_method = Some(partition.method);
        stats.cluster_count = clusters.len();
        stats.average_cluster_size = partition.average_size();
        stats.clustered_articles = clusters.iter().map(ClusterGroup::len).sum();

        let representatives: Vec<ArticleId> = clusters.iter().map(|c| c.representative).collect();
        let kept = ensure_diversity(
            &representatives,
            arena,
            config.max_same_source,
            config.diversity_reset_hours,
        );

        assemble_results(&kept, &clusters, arena, premerge, config.result_cap())
    }

    /// Semantic matrix, or `None` when the stage is disabled, gated off or failed.
    fn semantic_similarity(
        &self,
        texts: &[String],
        lexical: &SimilarityMatrix,
    ) -> Option<SimilarityMatrix> {
        if !self.config.enable_bert {
            return None;
        }
        let Some(service) = &self.embeddings else {
            debug!(target: TARGET_DEDUP, "No embedding service configured; skipping semantic stage");
            return None;
        };
        if !has_semantic_candidates(lexical, self.config.semantic_gate_threshold) {
            info!(target: TARGET_DEDUP,
                "No pair above {} lexical similarity; skipping semantic stage",
                self.config.semantic_gate_threshold
            );
            return None;
        }

        calculate_semantic_similarity(texts, service).ok()
    }
}

/// Maps a partition of matrix indices onto article ids and picks each
/// cluster's representative.
fn build_clusters(
    partition: &Partition,
    canonical: &[ArticleId],
    arena: &[Article],
) -> Result<Vec<ClusterGroup>> {
    partition
        .groups
        .iter()
        .enumerate()
        .map(|(ordinal, group)| {
            let members = group
                .iter()
                .map(|&idx| {
                    canonical
                        .get(idx)
                        .copied()
                        .ok_or_else(|| anyhow::anyhow!("Cluster index {} out of range", idx))
                })
                .collect::<Result<Vec<_>>>()?;
            let representative = select_representative(&members, arena)
                .ok_or_else(|| anyhow::anyhow!("Cluster {} has no members", ordinal))?;
            Ok(ClusterGroup {
                cluster_id: cluster_label(ordinal),
                members,
                representative,
            })
        })
        .collect()
}

/// Result used when the pipeline cannot complete: every input article, newest
/// first, without relations and capped to `max_results`.
pub fn degraded_results(records: &[ArticleRecord], config: &DedupConfig) -> Vec<DedupedArticle> {
    let arena = ingest_batch(records, false);
    let ids: Vec<ArticleId> = arena.iter().map(|article| article.id).collect();
    let ordered = truncate_results(order_by_recency(&ids, &arena), config.result_cap());

    ordered
        .into_iter()
        .filter_map(|id| lookup(&arena, id).ok())
        .map(|article| DedupedArticle::from_record(&article.record, None, true, Vec::new()))
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Lexical-only convenience entry point.
pub fn deduplicate_articles(articles: &[ArticleRecord], config: &DedupConfig) -> Vec<DedupedArticle> {
    Deduplicator::new(config.clone(), None).deduplicate(articles)
}
