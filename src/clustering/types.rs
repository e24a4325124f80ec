use serde::Serialize;

use crate::article::ArticleId;

/// Struct representing one story-cluster of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterGroup {
    /// `C_<ordinal>`; only meaningful within one run.
    pub cluster_id: String,
    pub members: Vec<ArticleId>,
    pub representative: ArticleId,
}

impl ClusterGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members other than the representative, in cluster order.
    pub fn others(&self) -> impl Iterator<Item = ArticleId> + '_ {
        let representative = self.representative;
        self.members.iter().copied().filter(move |&id| id != representative)
    }
}

/// How the partition of a batch was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClusteringMethod {
    AverageLinkage,
    GreedyFallback,
}

/// Partition of matrix indices into clusters, ordered by lowest member index.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub groups: Vec<Vec<usize>>,
    pub method: ClusteringMethod,
}

impl Partition {
    pub fn average_size(&self) -> f64 {
        if self.groups.is_empty() {
            return 0.0;
        }
        let total: usize = self.groups.iter().map(Vec::len).sum();
        total as f64 / self.groups.len() as f64
    }
}

pub fn cluster_label(ordinal: usize) -> String {
    format!("C_{}", ordinal)
}
