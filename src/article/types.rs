use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::text::make_article_hash_key;
use super::timestamp::parse_published_at;

/// Article as delivered by the upstream collector.
///
/// Only `title`, `summary` and `source` are expected on every record; everything
/// else may be missing. Fields the engine does not know about are kept in `extra`
/// and handed back untouched on the way out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArticleRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub hash_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArticleRecord {
    /// Link with surrounding whitespace removed, `None` when blank.
    pub fn link_key(&self) -> Option<&str> {
        non_blank(self.link.as_deref())
    }

    pub fn hash_key_value(&self) -> Option<&str> {
        non_blank(self.hash_key.as_deref())
    }

    pub fn source_name(&self) -> &str {
        non_blank(self.source.as_deref()).unwrap_or("unknown")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Stable identity of an article within one batch: its position in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArticleId(pub usize);

/// An input record after validation at the ingestion boundary.
#[derive(Debug, Clone)]
pub struct Article {
    pub id: ArticleId,
    pub record: ArticleRecord,
    /// Parsed `published_at`; `None` when absent or unparsable.
    pub published: Option<DateTime<Utc>>,
    /// Explicit `hash_key`, or (when derivation is enabled) one built from title and image.
    pub hash_key: Option<String>,
}

impl Article {
    pub fn ingest(id: ArticleId, record: &ArticleRecord, derive_hash_key: bool) -> Self {
        let published = record.published_at.as_deref().and_then(parse_published_at);
        let hash_key = match record.hash_key_value() {
            Some(key) => Some(key.to_string()),
            None if derive_hash_key => {
                make_article_hash_key(Some(&record.title), record.image_url.as_deref())
            }
            None => None,
        };

        Self {
            id,
            record: record.clone(),
            published,
            hash_key,
        }
    }

    pub fn source(&self) -> &str {
        self.record.source_name()
    }
}

/// Validates a batch once and assigns each record its `ArticleId`.
pub fn ingest_batch(records: &[ArticleRecord], derive_hash_keys: bool) -> Vec<Article> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| Article::ingest(ArticleId(idx), record, derive_hash_keys))
        .collect()
}

/// Light-weight payload listed under a representative's `related_articles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelatedArticle {
    pub title: String,
    pub source: Option<String>,
    pub link: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub image_url: Option<String>,
    pub cluster_id: Option<String>,
    pub representative: bool,
}

impl RelatedArticle {
    pub fn from_record(record: &ArticleRecord, cluster_id: Option<&str>, representative: bool) -> Self {
        Self {
            title: record.title.clone(),
            source: record.source.clone(),
            link: record.link.clone(),
            url: record.link.clone(),
            published_at: record.published_at.clone(),
            image_url: record.image_url.clone(),
            cluster_id: cluster_id.map(str::to_string),
            representative,
        }
    }
}

// Keys the engine writes itself; stale copies in pass-through fields are dropped.
const RESERVED_OUTPUT_KEYS: &[&str] = &["cluster_id", "representative", "related_articles", "hash_key"];

/// One entry of the engine's output. `hash_key` is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DedupedArticle {
    pub title: String,
    pub summary: String,
    pub link: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<String>,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub cluster_id: Option<String>,
    pub representative: bool,
    pub related_articles: Vec<RelatedArticle>,
}

impl DedupedArticle {
    pub fn from_record(
        record: &ArticleRecord,
        cluster_id: Option<String>,
        representative: bool,
        related_articles: Vec<RelatedArticle>,
    ) -> Self {
        let mut extra = record.extra.clone();
        for key in RESERVED_OUTPUT_KEYS {
            extra.remove(*key);
        }

        Self {
            title: record.title.clone(),
            summary: record.summary.clone(),
            link: record.link.clone(),
            source: record.source.clone(),
            published_at: record.published_at.clone(),
            image_url: record.image_url.clone(),
            extra,
            cluster_id,
            representative,
            related_articles,
        }
    }
}
