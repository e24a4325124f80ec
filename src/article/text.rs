use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use super::types::ArticleRecord;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap();
    // "[Reporter Kim]" style bylines and ad markers inside square brackets
    static ref BRACKET_META: Regex =
        Regex::new(r"(?i)\[[^\]]*(기자|특파원|특가|이벤트|쿠폰|reporter|sponsored)[^\]]*\]").unwrap();
    // "(Seoul=Yonhap) ... reporter" style datelines
    static ref DATELINE: Regex =
        Regex::new(r"\([^)]*=[^)]*(기자|특파원|뉴스|연합뉴스|뉴시스|뉴스1)[^)]*\)").unwrap();
}

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&lsquo;", "'"),
    ("&rsquo;", "'"),
    ("&ldquo;", "\""),
    ("&rdquo;", "\""),
    ("&middot;", "·"),
    ("&hellip;", "…"),
    ("&amp;", "&"),
];

fn decode_entities(text: &str) -> String {
    let mut decoded = NUMERIC_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let raw = &caps[1];
            let code = match raw.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();

    // `&amp;` goes last so "&amp;lt;" decodes to "&lt;" rather than "<"
    for (entity, replacement) in NAMED_ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    decoded
}

/// Replaces control characters with spaces and collapses runs of whitespace.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes a title or summary for similarity comparison.
///
/// Decodes HTML entities, strips tags and bracketed byline/ad metadata, folds
/// typographic quotes, cleans whitespace and lowercases. Never fails; empty in,
/// empty out.
pub fn normalize_article_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let text = decode_entities(text);
    let text = HTML_TAG.replace_all(&text, " ");
    let text = DATELINE.replace_all(&text, " ");
    let text = BRACKET_META.replace_all(&text, " ");
    let text: String = text
        .nfc()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();

    clean_text(&text).to_lowercase()
}

/// Builds the string an article is compared by: the title twice, then the summary.
pub fn prepare_text(record: &ArticleRecord) -> String {
    let title = normalize_article_text(&record.title);
    let summary = normalize_article_text(&record.summary);
    format!("{} {} {}", title, title, summary).trim().to_string()
}

/// Identity hash over normalized title and image URL, `None` if both are empty.
pub fn make_article_hash_key(title: Option<&str>, image_url: Option<&str>) -> Option<String> {
    let normalized_title = normalize_article_text(title.unwrap_or_default());
    let normalized_image = image_url.unwrap_or_default().trim();

    if normalized_title.is_empty() && normalized_image.is_empty() {
        return None;
    }

    let digest = Sha256::digest(format!("{}::{}", normalized_title, normalized_image).as_bytes());
    Some(format!("{:x}", digest))
}
