use anyhow::Result;
use std::collections::{HashMap, HashSet};

use crate::article::{Article, ArticleId, DedupedArticle, RelatedArticle};
use crate::clustering::ClusterGroup;
use crate::dedup::premerge::PreMerge;
use crate::dedup::selection::lookup;

/// Keeps the first `cap` entries; `None` keeps everything.
pub fn truncate_results<T>(mut items: Vec<T>, cap: Option<usize>) -> Vec<T> {
    if let Some(cap) = cap {
        items.truncate(cap);
    }
    items
}

/// Related payloads for one representative.
///
/// Other cluster members come first, each followed by the articles the
/// pre-merge collapsed onto it, then the representative's own collapsed
/// articles. Entries are deduplicated by link, first occurrence wins; entries
/// without a link are kept as they cannot collide.
pub fn build_related_articles(
    group: &ClusterGroup,
    arena: &[Article],
    premerge: &PreMerge,
) -> Result<Vec<RelatedArticle>> {
    let cluster_id = Some(group.cluster_id.as_str());
    let mut candidates: Vec<&Article> = Vec::new();

    for other in group.others() {
        candidates.push(lookup(arena, other)?);
        for &satellite in premerge.satellites_of(other) {
            candidates.push(lookup(arena, satellite)?);
        }
    }
    for &satellite in premerge.satellites_of(group.representative) {
        candidates.push(lookup(arena, satellite)?);
    }

    let mut seen_links: HashSet<&str> = HashSet::new();
    Ok(candidates
        .into_iter()
        .filter(|&article| match article.record.link_key() {
            Some(link) => seen_links.insert(link),
            None => true,
        })
        .map(|article| RelatedArticle::from_record(&article.record, cluster_id, false))
        .collect())
}

/// Output for a batch that pre-merged down to one canonical article: the
/// article itself with its collapsed duplicates as relations, no cluster.
pub fn assemble_single(id: ArticleId, arena: &[Article], premerge: &PreMerge) -> Result<DedupedArticle> {
    let article = lookup(arena, id)?;
    let related = premerge
        .satellites_of(id)
        .iter()
        .map(|&satellite| {
            lookup(arena, satellite).map(|a| RelatedArticle::from_record(&a.record, None, false))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DedupedArticle::from_record(&article.record, None, true, related))
}

/// Final output: capped representatives with cluster metadata and relations.
pub fn assemble_results(
    kept: &[ArticleId],
    clusters: &[ClusterGroup],
    arena: &[Article],
    premerge: &PreMerge,
    cap: Option<usize>,
) -> Result<Vec<DedupedArticle>> {
    let by_representative: HashMap<ArticleId, &ClusterGroup> = clusters
        .iter()
        .map(|group| (group.representative, group))
        .collect();

    truncate_results(kept.to_vec(), cap)
        .into_iter()
        .map(|id| {
            let article = lookup(arena, id)?;
            let group = by_representative
                .get(&id)
                .ok_or_else(|| anyhow::anyhow!("Article {:?} does not represent a cluster", id))?;
            let related = build_related_articles(group, arena, premerge)?;
            Ok(DedupedArticle::from_record(
                &article.record,
                Some(group.cluster_id.clone()),
                true,
                related,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ingest_batch, ArticleRecord};
    use crate::dedup::premerge::premerge_by_hash;

    fn record(title: &str, link: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            title: title.into(),
            link: link.map(str::to_string),
            hash_key: Some(format!("hash-{}", title)),
            ..Default::default()
        }
    }

    fn fixture() -> (Vec<Article>, PreMerge, Vec<ClusterGroup>) {
        let arena = ingest_batch(
            &[
                record("rep", Some("https://x/rep")),
                record("member", Some("https://x/member")),
                record("member copy", Some("https://x/member")),
                record("rep copy", Some("https://x/rep")),
                record("member no link", None),
                record("alone", Some("https://x/alone")),
            ],
            false,
        );
        let premerge = premerge_by_hash(&arena);
        let clusters = vec![
            ClusterGroup {
                cluster_id: "C_0".into(),
                members: vec![ArticleId(0), ArticleId(1), ArticleId(4)],
                representative: ArticleId(0),
            },
            ClusterGroup {
                cluster_id: "C_1".into(),
                members: vec![ArticleId(5)],
                representative: ArticleId(5),
            },
        ];
        (arena, premerge, clusters)
    }

    #[test]
    fn test_related_articles_order_and_dedup() {
        let (arena, premerge, clusters) = fixture();
        let related = build_related_articles(&clusters[0], &arena, &premerge).unwrap();
        let titles: Vec<&str> = related.iter().map(|r| r.title.as_str()).collect();
        // "member copy" shares its link with "member" and is dropped
        assert_eq!(titles, vec!["member", "member no link", "rep copy"]);
        assert!(related.iter().all(|r| !r.representative));
        assert!(related.iter().all(|r| r.cluster_id.as_deref() == Some("C_0")));
        assert_eq!(related[0].url, related[0].link);
    }

    #[test]
    fn test_assemble_results() {
        let (arena, premerge, clusters) = fixture();
        let kept = vec![ArticleId(5), ArticleId(0)];
        let out = assemble_results(&kept, &clusters, &arena, &premerge, None).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "alone");
        assert!(out[0].related_articles.is_empty());
        assert_eq!(out[1].cluster_id.as_deref(), Some("C_0"));
        assert!(out[1].representative);
        assert_eq!(out[1].related_articles.len(), 3);

        let capped = assemble_results(&kept, &clusters, &arena, &premerge, Some(1)).unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let (arena, premerge, clusters) = fixture();
        let kept = vec![ArticleId(0), ArticleId(5)];
        let first = assemble_results(&kept, &clusters, &arena, &premerge, None).unwrap();
        let second = assemble_results(&kept, &clusters, &arena, &premerge, None).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_assemble_single() {
        let (arena, premerge, _) = fixture();
        let single = assemble_single(ArticleId(0), &arena, &premerge).unwrap();
        assert!(single.representative);
        assert_eq!(single.cluster_id, None);
        assert_eq!(single.related_articles.len(), 1);
        assert_eq!(single.related_articles[0].title, "rep copy");
        assert_eq!(single.related_articles[0].cluster_id, None);
    }

    #[test]
    fn test_non_representative_is_an_error() {
        let (arena, premerge, clusters) = fixture();
        assert!(assemble_results(&[ArticleId(1)], &clusters, &arena, &premerge, None).is_err());
    }
}
