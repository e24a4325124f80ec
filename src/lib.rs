pub mod article;
pub mod clustering;
pub mod common;
pub mod dedup;
pub mod environment;
pub mod logging;
pub mod similarity;
pub mod vector;

pub use article::{ArticleRecord, DedupedArticle, RelatedArticle};
pub use dedup::{deduplicate_articles, DedupConfig, DedupReport, Deduplicator};
pub use vector::{EmbeddingConfig, EmbeddingService};
