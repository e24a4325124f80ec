use anyhow::Result;
use std::cmp::Ordering;
use tracing::warn;

use crate::article::{Article, ArticleId};
use crate::dedup::TARGET_DEDUP;

/// Summary length (in characters) that earns the full summary score.
const FULL_SUMMARY_CHARS: f64 = 500.0;
const SUMMARY_WEIGHT: f64 = 0.7;
const TITLE_WEIGHT: f64 = 0.3;

pub(crate) fn lookup(arena: &[Article], id: ArticleId) -> Result<&Article> {
    arena
        .get(id.0)
        .filter(|article| article.id == id)
        .ok_or_else(|| anyhow::anyhow!("Unknown article id {:?}", id))
}

/// 1.0 for titles of 10 to 100 characters, 0.5 for anything shorter or longer.
pub fn title_quality(title: &str) -> f64 {
    let length = title.chars().count();
    if (10..=100).contains(&length) {
        1.0
    } else {
        0.5
    }
}

/// Information-density score: 70% summary length, 30% title quality.
pub fn information_density(article: &Article) -> f64 {
    let summary_chars = article.record.summary.chars().count() as f64;
    let summary_score = (summary_chars / FULL_SUMMARY_CHARS).min(1.0);
    SUMMARY_WEIGHT * summary_score + TITLE_WEIGHT * title_quality(&article.record.title)
}

fn rank_members(members: &[ArticleId], arena: &[Article]) -> Result<Vec<ArticleId>> {
    let mut candidates: Vec<(&Article, f64)> = members
        .iter()
        .map(|&id| lookup(arena, id).map(|article| (article, information_density(article))))
        .collect::<Result<_>>()?;

    // Newest first, then by density; both sorts are stable so pipeline order breaks ties
    candidates.sort_by(|a, b| b.0.published.cmp(&a.0.published));
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    Ok(candidates.into_iter().map(|(article, _)| article.id).collect())
}

/// Picks the article shown for a cluster.
///
/// Information density decides; recency only orders candidates of equal density.
/// If ranking fails the first member in pipeline order is used.
pub fn select_representative(members: &[ArticleId], arena: &[Article]) -> Option<ArticleId> {
    let first = *members.first()?;
    if members.len() == 1 {
        return Some(first);
    }

    match rank_members(members, arena) {
        Ok(ranked) => ranked.first().copied().or(Some(first)),
        Err(e) => {
            warn!(target: TARGET_DEDUP,
                "Representative scoring failed ({:#}); keeping original order",
                e
            );
            Some(first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ingest_batch, ArticleRecord};

    fn record(title: &str, summary_len: usize, published_at: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            title: title.into(),
            summary: "x".repeat(summary_len),
            published_at: published_at.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_quality() {
        assert_eq!(title_quality("Short"), 0.5);
        assert_eq!(title_quality("Exactly10!"), 1.0);
        assert_eq!(title_quality(&"t".repeat(100)), 1.0);
        assert_eq!(title_quality(&"t".repeat(101)), 0.5);
        // Counted in characters, not bytes
        assert_eq!(title_quality("반도체 수출 회복세 뚜렷"), 1.0);
    }

    #[test]
    fn test_information_density() {
        let arena = ingest_batch(&[record("A reasonable title", 250, None)], false);
        assert!((information_density(&arena[0]) - (0.7 * 0.5 + 0.3)).abs() < 1e-9);

        let long = ingest_batch(&[record("Tiny", 2000, None)], false);
        assert!((information_density(&long[0]) - (0.7 + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn test_density_beats_recency() {
        let arena = ingest_batch(
            &[
                record("Older but much richer story", 500, Some("2024-01-01T08:00:00Z")),
                record("Newer thin story here", 50, Some("2024-01-01T12:00:00Z")),
            ],
            false,
        );
        let members = [ArticleId(0), ArticleId(1)];
        assert_eq!(select_representative(&members, &arena), Some(ArticleId(0)));
    }

    #[test]
    fn test_recency_breaks_density_ties() {
        let arena = ingest_batch(
            &[
                record("Same density story", 100, Some("2024-01-01T08:00:00Z")),
                record("Same density story", 100, None),
                record("Same density story", 100, Some("2024-01-01T12:00:00Z")),
            ],
            false,
        );
        let members = [ArticleId(0), ArticleId(1), ArticleId(2)];
        assert_eq!(select_representative(&members, &arena), Some(ArticleId(2)));
    }

    #[test]
    fn test_singleton_and_empty() {
        let arena = ingest_batch(&[record("Only one here", 10, None)], false);
        assert_eq!(select_representative(&[ArticleId(0)], &arena), Some(ArticleId(0)));
        assert_eq!(select_representative(&[], &arena), None);
    }

    #[test]
    fn test_unknown_member_falls_back_to_first() {
        let arena = ingest_batch(&[record("Only one here", 10, None)], false);
        assert_eq!(
            select_representative(&[ArticleId(0), ArticleId(9)], &arena),
            Some(ArticleId(0))
        );
    }
}
