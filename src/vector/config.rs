use anyhow::Result;
use candle_core::Device;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::environment::{get_env_var_as_bool, get_env_var_or};
use crate::vector::{CONFIG_URL, MODEL_URL, TARGET_VECTOR, TOKENIZER_URL};

/// Configuration for the sentence-embedding model
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model_path: String,
    pub tokenizer_path: String,
    pub config_path: String,
    /// Tokens kept per text; longer inputs are truncated.
    pub max_length: usize,
    pub gpu_batch_size: usize,
    pub cpu_batch_size: usize,
    pub use_gpu: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: "models/paraphrase-multilingual-MiniLM-L12-v2.safetensors".to_string(),
            tokenizer_path: "models/paraphrase-multilingual-MiniLM-L12-v2.tokenizer.json"
                .to_string(),
            config_path: "models/paraphrase-multilingual-MiniLM-L12-v2.config.json".to_string(),
            max_length: 128,
            gpu_batch_size: 64,
            cpu_batch_size: 32,
            use_gpu: true,
        }
    }
}

impl EmbeddingConfig {
    /// Defaults overridden by `EMBEDDING_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_path: get_env_var_or("EMBEDDING_MODEL_PATH", defaults.model_path.clone()),
            tokenizer_path: get_env_var_or(
                "EMBEDDING_TOKENIZER_PATH",
                defaults.tokenizer_path.clone(),
            ),
            config_path: get_env_var_or("EMBEDDING_CONFIG_PATH", defaults.config_path.clone()),
            max_length: get_env_var_or("EMBEDDING_MAX_LENGTH", defaults.max_length),
            use_gpu: get_env_var_as_bool("EMBEDDING_USE_GPU", defaults.use_gpu),
            ..defaults
        }
    }

    /// GPU when requested and available, CPU otherwise.
    pub fn select_device(&self) -> Device {
        if !self.use_gpu {
            return Device::Cpu;
        }
        match Device::cuda_if_available(0) {
            Ok(device) => {
                if device.is_cuda() {
                    info!(target: TARGET_VECTOR, "GPU available; embeddings will run on CUDA");
                } else {
                    info!(target: TARGET_VECTOR, "GPU not available; embeddings will run on CPU");
                }
                device
            }
            Err(e) => {
                warn!(target: TARGET_VECTOR, "Failed to probe GPU ({}); using CPU", e);
                Device::Cpu
            }
        }
    }

    /// Larger batches on GPU, smaller on CPU.
    pub fn batch_size_for(&self, device: &Device) -> usize {
        if device.is_cuda() {
            self.gpu_batch_size.max(1)
        } else {
            self.cpu_batch_size.max(1)
        }
    }

    pub fn models_exist(&self) -> bool {
        [&self.model_path, &self.tokenizer_path, &self.config_path]
            .iter()
            .all(|path| Path::new(path).exists())
    }

    /// Downloads any missing model file. Only used by tooling; the engine itself
    /// loads from local paths.
    pub async fn ensure_models_exist(&self) -> Result<()> {
        for (url, path) in [
            (MODEL_URL, &self.model_path),
            (TOKENIZER_URL, &self.tokenizer_path),
            (CONFIG_URL, &self.config_path),
        ] {
            if Path::new(path).exists() {
                continue;
            }
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).await?;
                }
            }

            info!(target: TARGET_VECTOR, "Downloading {} to {}", url, path);
            let response = reqwest::get(url).await?.error_for_status()?;
            let bytes = response.bytes().await?;
            fs::write(path, bytes).await?;
            info!(target: TARGET_VECTOR, "Downloaded {}", path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_by_device() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.batch_size_for(&Device::Cpu), 32);

        let cpu_only = EmbeddingConfig {
            use_gpu: false,
            ..Default::default()
        };
        assert!(matches!(cpu_only.select_device(), Device::Cpu));
    }

    #[test]
    fn test_missing_models_detected() {
        let config = EmbeddingConfig {
            model_path: "does/not/exist.safetensors".into(),
            ..Default::default()
        };
        assert!(!config.models_exist());
    }
}
