use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::info;

use storyfold::{ArticleRecord, DedupConfig, Deduplicator, EmbeddingConfig, EmbeddingService};

/// Deduplicate a batch of news articles.
///
/// Reads a JSON array of articles from a file (or stdin), clusters near
/// duplicates and prints one representative per story as JSON. Options not
/// given on the command line come from the environment (SIMILARITY_THRESHOLD,
/// MAX_RESULTS, ENABLE_BERT, ...).
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with an array of articles; reads stdin when omitted or "-"
    input: Option<PathBuf>,

    /// Write results here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Similarity above which articles are the same story (0.0-1.0)
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Maximum number of representatives; 0 disables the cap
    #[arg(short, long)]
    max_results: Option<i64>,

    /// Longest run of consecutive representatives from one source
    #[arg(long)]
    max_same_source: Option<usize>,

    /// Weight of TF-IDF similarity in the fused score
    #[arg(long)]
    tfidf_weight: Option<f32>,

    /// Weight of embedding similarity in the fused score
    #[arg(long)]
    bert_weight: Option<f32>,

    /// Skip the embedding similarity stage
    #[arg(long)]
    no_bert: bool,

    /// Derive title+image hash keys for articles that have none
    #[arg(long)]
    derive_hash_keys: bool,

    /// Print the full report (articles, statistics, degradation reason)
    #[arg(long)]
    report: bool,
}

impl Cli {
    fn config(&self) -> DedupConfig {
        let mut config = DedupConfig::from_env();
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        if let Some(max_results) = self.max_results {
            config.max_results = max_results;
        }
        if let Some(max_same_source) = self.max_same_source {
            config.max_same_source = max_same_source;
        }
        if let Some(weight) = self.tfidf_weight {
            config.tfidf_weight = weight;
        }
        if let Some(weight) = self.bert_weight {
            config.bert_weight = weight;
        }
        if self.no_bert {
            config.enable_bert = false;
        }
        if self.derive_hash_keys {
            config.derive_hash_keys = true;
        }
        config
    }
}

async fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await?;
            Ok(buffer)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    storyfold::logging::configure_logging();

    let cli = Cli::parse();
    let config = cli.config();

    let raw = read_input(cli.input.as_ref()).await?;
    let articles: Vec<ArticleRecord> =
        serde_json::from_str(&raw).context("Input must be a JSON array of articles")?;
    info!("Loaded {} articles", articles.len());

    let embeddings = config
        .enable_bert
        .then(|| Arc::new(EmbeddingService::new(EmbeddingConfig::from_env())));
    let deduplicator = Deduplicator::new(config, embeddings);

    // Embedding inference is CPU/GPU bound
    let report = tokio::task::spawn_blocking(move || deduplicator.run(&articles)).await?;

    let json = if cli.report {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.articles)?
    };

    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!("Wrote {} articles to {}", report.articles.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
