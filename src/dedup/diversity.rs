use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::article::{hours_between, Article, ArticleId};
use crate::dedup::selection::lookup;
use crate::dedup::TARGET_DEDUP;

/// Running state of the diversity pass; lives for one call only.
#[derive(Debug, Default)]
struct DiversityCursor<'a> {
    last_source: Option<&'a str>,
    /// Publication time of the last article that was kept.
    last_timestamp: Option<DateTime<Utc>>,
    consecutive_count: usize,
}

impl<'a> DiversityCursor<'a> {
    /// Advances the streak for `source` and returns the updated run length.
    fn advance(
        &mut self,
        source: &'a str,
        published: Option<DateTime<Utc>>,
        reset_hours: f64,
    ) -> usize {
        if self.last_source == Some(source) {
            self.consecutive_count += 1;
            // Same outlet hours apart is a new story, not a burst
            if let Some(gap) = hours_between(published, self.last_timestamp) {
                if gap > 0.0 && gap >= reset_hours {
                    debug!(target: TARGET_DEDUP,
                        "Resetting run for {} after a {:.1} hour gap",
                        source,
                        gap
                    );
                    self.consecutive_count = 1;
                }
            }
        } else {
            self.consecutive_count = 1;
            self.last_source = Some(source);
        }
        self.consecutive_count
    }
}

/// Orders representatives newest first; unknown timestamps go last and ties
/// keep their input order.
pub fn order_by_recency(ids: &[ArticleId], arena: &[Article]) -> Vec<ArticleId> {
    let mut ordered: Vec<(ArticleId, Option<DateTime<Utc>>)> = ids
        .iter()
        .map(|&id| (id, lookup(arena, id).ok().and_then(|a| a.published)))
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered.into_iter().map(|(id, _)| id).collect()
}

/// Throttles runs of consecutive same-source representatives.
///
/// Representatives are walked newest first. An article is kept while its
/// source's current run is at most `max_same_source` long; a gap of at least
/// `reset_hours` since the last kept article starts a fresh run. Dropped
/// articles are not merged anywhere else.
pub fn ensure_diversity(
    representatives: &[ArticleId],
    arena: &[Article],
    max_same_source: usize,
    reset_hours: f64,
) -> Vec<ArticleId> {
    if representatives.is_empty() {
        return Vec::new();
    }

    let mut cursor = DiversityCursor::default();
    let mut kept = Vec::with_capacity(representatives.len());
    let mut sources: HashSet<&str> = HashSet::new();

    for id in order_by_recency(representatives, arena) {
        let Ok(article) = lookup(arena, id) else {
            debug!(target: TARGET_DEDUP, "Skipping unknown representative {:?}", id);
            continue;
        };
        let source = article.source();
        let run = cursor.advance(source, article.published, reset_hours);

        if run <= max_same_source {
            kept.push(id);
            sources.insert(source);
            cursor.last_timestamp = article.published;
        } else {
            debug!(target: TARGET_DEDUP,
                "Skipping article for diversity: {} ({} in a row)",
                source,
                run
            );
        }
    }

    info!(target: TARGET_DEDUP,
        "Diversity pass complete: {} -> {} articles ({} sources)",
        representatives.len(),
        kept.len(),
        sources.len()
    );
    kept
}
