//! Trigger words, tag summaries and provenance URLs from header metadata.
//!
//! All extractors return `None` for missing or malformed input.

use super::header::{HeaderMetadata, MetadataValue};
use crate::config::ScannerConfig;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Metadata keys written by kohya-ss style trainers.
pub mod keys {
    pub const BASE_MODEL_VERSION: &str = "ss_base_model_version";
    pub const MODEL_NAME: &str = "ss_sd_model_name";
    pub const TRAINING_COMMENT: &str = "ss_training_comment";
    pub const TAG_FREQUENCY: &str = "ss_tag_frequency";

    /// Fields searched for a provenance URL, in order.
    pub const URL_FIELDS: &[&str] = &[
        TRAINING_COMMENT,
        "modelspec.description",
        "modelspec.source",
        "description",
        "url",
        "source",
        MODEL_NAME,
    ];
}

/// Host that marks a provenance URL.
const SOURCE_HOST: &str = "civitai.com";

/// `trigger word:` or `trigger:` followed by text up to a comma or newline.
static TRIGGER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:trigger word:|trigger:)([^,\r\n]*)").unwrap());

/// Everything the extractor found for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub trigger_word: Option<String>,
    pub top_tags: Option<String>,
    pub source_url: Option<String>,
}

/// Run the extractors that apply to a file's category.
///
/// Trigger word and tags are LoRA-only; the source URL applies to every item.
pub fn extract(metadata: &HeaderMetadata, is_lora: bool) -> Extracted {
    let mut found = Extracted {
        source_url: source_url(metadata),
        ..Extracted::default()
    };
    if is_lora {
        found.trigger_word = metadata
            .get_text(keys::TRAINING_COMMENT)
            .and_then(trigger_word);
        found.top_tags = metadata.get(keys::TAG_FREQUENCY).and_then(top_tags);
    }
    found
}

/// Extract a trigger word from a training comment.
pub fn trigger_word(comment: &str) -> Option<String> {
    let captures = TRIGGER_MARKER.captures(comment)?;
    let word = captures.get(1)?.as_str().trim();
    if word.is_empty() {
        None
    } else {
        Some(word.to_string())
    }
}

/// Summarise a tag-frequency field as its most frequent tag names.
///
/// The field maps dataset names to `{tag: count}` mappings, either as a
/// JSON-encoded string or as an already nested mapping. Counts for the same
/// tag are summed across datasets.
pub fn top_tags(value: &MetadataValue) -> Option<String> {
    let mut counts: HashMap<String, u64> = HashMap::new();

    match value {
        MetadataValue::Text(raw) => {
            let Ok(Value::Object(datasets)) = serde_json::from_str::<Value>(raw) else {
                return None;
            };
            for dataset in datasets.values() {
                let Some(tags) = dataset.as_object() else {
                    continue;
                };
                for (tag, count) in tags {
                    if let Some(n) = json_count(count) {
                        add_tag(&mut counts, tag, n);
                    }
                }
            }
        }
        MetadataValue::Nested(datasets) => {
            for dataset in datasets.values() {
                let MetadataValue::Nested(tags) = dataset else {
                    continue;
                };
                for (tag, count) in tags {
                    if let Some(n) = count.as_text().and_then(|c| c.trim().parse::<u64>().ok()) {
                        add_tag(&mut counts, tag, n);
                    }
                }
            }
        }
    }

    if counts.is_empty() {
        return None;
    }

    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Some(
        ranked
            .into_iter()
            .take(ScannerConfig::TOP_TAG_LIMIT)
            .map(|(tag, _)| tag)
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn add_tag(counts: &mut HashMap<String, u64>, tag: &str, n: u64) {
    let tag = tag.trim();
    if !tag.is_empty() {
        *counts.entry(tag.to_string()).or_insert(0) += n;
    }
}

/// Non-negative integral count from a JSON number.
fn json_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| *f >= 0.0 && f.fract() == 0.0)
        .map(|f| f as u64)
}

/// Find a civitai.com URL in the first metadata field that mentions one.
pub fn source_url(metadata: &HeaderMetadata) -> Option<String> {
    keys::URL_FIELDS.iter().find_map(|key| {
        let text = metadata.get_text(key)?;
        if !text.contains(SOURCE_HOST) {
            return None;
        }
        text.split_whitespace()
            .find(|token| token.contains(SOURCE_HOST))
            .map(|token| token.trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}
