//! Article records: the input/output shapes of the engine and the text
//! preparation every similarity signal is computed from.

pub mod text;
pub mod timestamp;
pub mod types;

pub use text::{clean_text, make_article_hash_key, normalize_article_text, prepare_text};
pub use timestamp::{hours_between, parse_published_at};
pub use types::*;
