//! Story clustering over the fused similarity matrix.

pub mod agglomerative;
pub mod greedy;
#[cfg(test)]
mod tests;
pub mod types;

pub use agglomerative::average_linkage_clusters;
pub use greedy::greedy_threshold_groups;
pub use types::*;

use tracing::{error, info};

use crate::common::StageOutcome;
use crate::similarity::SimilarityMatrix;

pub const TARGET_CLUSTERING: &str = "clustering";

/// Recommended similarity above which articles count as the same story
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.75;

/// Runs average-linkage clustering as a stage with a typed outcome.
pub fn hierarchical_stage(
    similarity: &SimilarityMatrix,
    threshold: f32,
) -> StageOutcome<Vec<Vec<usize>>> {
    average_linkage_clusters(similarity, threshold).into()
}

/// Partitions the batch into story-clusters.
///
/// Falls back to greedy threshold grouping when hierarchical clustering
/// degrades. Always returns a partition covering every index exactly once.
pub fn find_similar_groups(similarity: &SimilarityMatrix, threshold: f32) -> Partition {
    let partition = match hierarchical_stage(similarity, threshold) {
        StageOutcome::Ok(groups) => Partition {
            groups,
            method: ClusteringMethod::AverageLinkage,
        },
        StageOutcome::Degraded(reason) => {
            error!(target: TARGET_CLUSTERING,
                "Hierarchical clustering failed: {}. Using greedy grouping.",
                reason
            );
            Partition {
                groups: greedy_threshold_groups(similarity, threshold),
                method: ClusteringMethod::GreedyFallback,
            }
        }
    };

    info!(target: TARGET_CLUSTERING,
        "Clustering complete: {} groups (threshold: {}, average size: {:.2}, method: {:?})",
        partition.groups.len(),
        threshold,
        partition.average_size(),
        partition.method
    );
    partition
}
