//! Catalog document types.
//!
//! These serialize to the camelCase JSON consumed by the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model category. Declaration order is the catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Full model checkpoint
    Checkpoint,
    /// LoRA adapter
    Lora,
    /// Textual-inversion embedding
    Embedding,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Checkpoint, Category::Lora, Category::Embedding];

    /// Lowercase name as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Checkpoint => "checkpoint",
            Category::Lora => "lora",
            Category::Embedding => "embedding",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Base-model architecture tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseModel {
    Sd15,
    Sdxl,
    Sd20,
    Pony,
    Flux,
    /// Tag not recognised by this version. Never produced by the classifier.
    #[serde(other)]
    Unknown,
}

impl BaseModel {
    /// Lowercase tag as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseModel::Sd15 => "sd15",
            BaseModel::Sdxl => "sdxl",
            BaseModel::Sd20 => "sd20",
            BaseModel::Pony => "pony",
            BaseModel::Flux => "flux",
            BaseModel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BaseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a base-model tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseModelSource {
    /// Read from the file's embedded training metadata (authoritative).
    Metadata,
    /// Guessed from the file name (best-effort).
    Filename,
}

/// How much to trust the base-model tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Checkpoint suitability for photographic and drawn output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suitability {
    pub photo: bool,
    pub drawing: bool,
}

/// Starter generation settings for a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presets {
    pub sampler: String,
    pub steps: u32,
    pub steps_range: String,
    pub cfg: f32,
    pub cfg_range: String,
}

/// One cataloged model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Stable content-derived fingerprint
    pub id: String,
    pub category: Category,
    /// File name without extension
    pub display_name: String,
    /// File name with extension
    pub file_name: String,
    /// Absolute path, `/`-separated
    pub path: String,
    /// Path relative to the scan root, `/`-separated
    pub rel_path: String,
    /// Size in bytes
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub base_model: BaseModel,
    pub base_model_source: BaseModelSource,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suitability: Option<Suitability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Presets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl CatalogItem {
    /// Total order used for catalog output.
    pub fn sort_key(&self) -> (Category, String, String) {
        (
            self.category,
            self.display_name.to_lowercase(),
            self.rel_path.clone(),
        )
    }
}

/// The scan output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub root_id: String,
    pub root_path: String,
    pub item_count: usize,
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    /// Number of items in a category.
    pub fn count(&self, category: Category) -> usize {
        self.items.iter().filter(|i| i.category == category).count()
    }
}

/// A discovered path that did not make it into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a scan produces.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub catalog: Catalog,
    /// Files and directories skipped during the walk or while reading
    pub skipped: Vec<SkippedEntry>,
    /// Where the catalog was written, if it was persisted
    pub written_to: Option<PathBuf>,
}
