use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use storyfold::vector::SentenceEncoder;
use storyfold::{EmbeddingConfig, EmbeddingService};

/// Download the sentence-embedding model used by the semantic similarity stage.
///
/// Files go to EMBEDDING_MODEL_PATH, EMBEDDING_TOKENIZER_PATH and
/// EMBEDDING_CONFIG_PATH (or the default paths when unset). Existing files are
/// left alone.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Load the model after downloading to make sure it is usable
    #[arg(long)]
    verify: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    storyfold::logging::configure_logging();

    let cli = Cli::parse();
    let config = EmbeddingConfig::from_env();

    if config.models_exist() {
        info!("Model files already present");
    } else {
        config.ensure_models_exist().await?;
    }

    if cli.verify {
        let service = EmbeddingService::new(config);
        let encoder = tokio::task::spawn_blocking(move || service.encoder())
            .await?
            .ok_or_else(|| anyhow!("Model files are present but could not be loaded"))?;
        let probe = encoder.encode(&["model check".to_string()])?;
        info!(
            "Model loaded on {} ({} dimensions)",
            encoder.device_label(),
            probe.first().map(Vec::len).unwrap_or(0)
        );
    }

    Ok(())
}
