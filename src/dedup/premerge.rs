use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::article::{Article, ArticleId};
use crate::dedup::TARGET_DEDUP;

/// Outcome of collapsing exact duplicates before any vector math.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreMerge {
    /// Surviving articles in first-seen order.
    pub canonical: Vec<ArticleId>,
    /// Articles collapsed onto each canonical article, in input order.
    pub satellites: BTreeMap<ArticleId, Vec<ArticleId>>,
}

impl PreMerge {
    pub fn satellites_of(&self, id: ArticleId) -> &[ArticleId] {
        self.satellites.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn collapsed_count(&self) -> usize {
        self.satellites.values().map(Vec::len).sum()
    }
}

/// Collapses articles sharing a `link` or a `hash_key` with an earlier canonical
/// article.
///
/// The link is checked first. A satellite's own keys are not registered, so
/// matching is always against canonical articles.
pub fn premerge_by_hash(articles: &[Article]) -> PreMerge {
    let mut result = PreMerge::default();
    let mut by_link: HashMap<&str, ArticleId> = HashMap::new();
    let mut by_hash: HashMap<&str, ArticleId> = HashMap::new();

    for article in articles {
        let link = article.record.link_key();
        let hash_key = article.hash_key.as_deref();

        let existing = link
            .and_then(|l| by_link.get(l))
            .or_else(|| hash_key.and_then(|h| by_hash.get(h)))
            .copied();

        if let Some(canonical) = existing {
            debug!(target: TARGET_DEDUP,
                "Article {:?} collapsed onto {:?} by link/hash",
                article.id,
                canonical
            );
            result.satellites.entry(canonical).or_default().push(article.id);
            continue;
        }

        result.canonical.push(article.id);
        if let Some(h) = hash_key {
            by_hash.insert(h, article.id);
        }
        if let Some(l) = link {
            by_link.insert(l, article.id);
        }
    }

    let collapsed = result.collapsed_count();
    if collapsed > 0 {
        info!(target: TARGET_DEDUP,
            "Hash/link pre-merge removed {} of {} articles",
            collapsed,
            articles.len()
        );
    }
    result
}
