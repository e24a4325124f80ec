// Sentence-embedding model and semantic similarity
pub const TARGET_VECTOR: &str = "vector";
pub const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2/resolve/main/model.safetensors";
pub const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2/resolve/main/tokenizer.json";
pub const CONFIG_URL: &str =
    "https://huggingface.co/sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2/resolve/main/config.json";

pub mod config;
pub mod embedding;
pub mod similarity;

// Re-export main components
pub use config::*;
pub use embedding::*;
pub use similarity::*;
