use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, error, info};

use crate::vector::{config::EmbeddingConfig, TARGET_VECTOR};

/// Turns texts into fixed-size, L2-normalized sentence embeddings.
///
/// Implementations must be safe to call from several batches at once; they are
/// never mutated after construction.
pub trait SentenceEncoder: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn device_label(&self) -> String {
        "cpu".to_string()
    }
}

/// BERT-family sentence encoder with masked mean pooling.
pub struct BertEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    batch_size: usize,
}

impl BertEncoder {
    /// Loads weights, model config and tokenizer from the local paths in `config`.
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let start = Instant::now();
        let device = config.select_device();
        info!(target: TARGET_VECTOR, "Loading embedding model from {}", config.model_path);

        let bert_config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(&config.config_path)?)?;

        let tensors =
            candle_core::safetensors::load_buffer(&std::fs::read(&config.model_path)?, &device)
                .map_err(|e| anyhow::anyhow!("Failed to load model tensors: {}", e))?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let model = BertModel::load(vb, &bert_config)
            .map_err(|e| anyhow::anyhow!("Failed to load BERT model: {}", e))?;

        let mut tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let batch_size = config.batch_size_for(&device);
        info!(target: TARGET_VECTOR,
            "Embedding model loaded in {:?} (device: {:?}, batch size: {})",
            start.elapsed(),
            device,
            batch_size
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            batch_size,
        })
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let batch = encodings.len();
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
        if batch == 0 || seq_len == 0 {
            return Err(anyhow::anyhow!("Tokenizer produced no tokens"));
        }

        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut mask = Vec::with_capacity(batch * seq_len);
        for encoding in &encodings {
            ids.extend_from_slice(encoding.get_ids());
            mask.extend_from_slice(encoding.get_attention_mask());
        }

        let input_ids = Tensor::from_vec(ids, (batch, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch, seq_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden_state = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        debug!(target: TARGET_VECTOR, "Shape of hidden_state: {:?}", hidden_state.shape());

        // Mean over real tokens only
        let mask_float = attention_mask.to_dtype(DType::F32)?;
        let mask_expanded = mask_float.unsqueeze(2)?.broadcast_as(hidden_state.shape())?;
        let summed = hidden_state.mul(&mask_expanded)?.sum(1)?;
        let counts = mask_float.sum(1)?.unsqueeze(1)?.clamp(1.0, f32::MAX)?;
        let mean_pooled = summed.broadcast_div(&counts)?;

        let norm = mean_pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f32::MAX)?;
        let normalized = mean_pooled.broadcast_div(&norm)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

impl SentenceEncoder for BertEncoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            // Tensors of each chunk are dropped before the next one is built
            embeddings.extend(self.encode_batch(chunk)?);
        }
        Ok(embeddings)
    }

    fn device_label(&self) -> String {
        format!("{:?}", self.device)
    }
}

/// Process-wide handle to the sentence encoder.
///
/// The encoder is loaded on first use and at most once: a lock-free check, then
/// the init lock, then a second check before loading. A failed load is remembered
/// so later batches do not retry it. After initialization inference needs no lock.
pub struct EmbeddingService {
    config: EmbeddingConfig,
    encoder: OnceLock<Option<Arc<dyn SentenceEncoder>>>,
    init_lock: Mutex<()>,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            encoder: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Service backed by an already constructed encoder.
    pub fn with_encoder(encoder: Arc<dyn SentenceEncoder>) -> Self {
        let service = Self::new(EmbeddingConfig::default());
        let _ = service.encoder.set(Some(encoder));
        service
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.encoder.get(), Some(Some(_)))
    }

    /// Returns the encoder, loading it on first call. `None` if loading failed.
    pub fn encoder(&self) -> Option<Arc<dyn SentenceEncoder>> {
        if let Some(loaded) = self.encoder.get() {
            return loaded.clone();
        }

        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(loaded) = self.encoder.get() {
            return loaded.clone();
        }

        let loaded: Option<Arc<dyn SentenceEncoder>> = match BertEncoder::load(&self.config) {
            Ok(encoder) => Some(Arc::new(encoder)),
            Err(e) => {
                error!(target: TARGET_VECTOR,
                    "Failed to load embedding model: {:#}. Only TF-IDF similarity will be used.",
                    e
                );
                None
            }
        };
        let _ = self.encoder.set(loaded.clone());
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEncoder;

    impl SentenceEncoder for FixedEncoder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[test]
    fn test_injected_encoder_is_used() {
        let service = EmbeddingService::with_encoder(Arc::new(FixedEncoder));
        assert!(service.is_loaded());
        let encoder = service.encoder().unwrap();
        assert_eq!(encoder.encode(&["a".to_string()]).unwrap(), vec![vec![1.0, 0.0]]);
        assert_eq!(encoder.device_label(), "cpu");
    }

    #[test]
    fn test_failed_load_is_remembered() {
        let service = EmbeddingService::new(EmbeddingConfig {
            model_path: "missing/model.safetensors".into(),
            tokenizer_path: "missing/tokenizer.json".into(),
            config_path: "missing/config.json".into(),
            use_gpu: false,
            ..Default::default()
        });
        assert!(service.encoder().is_none());
        assert!(service.encoder().is_none());
        assert!(!service.is_loaded());
    }
}
