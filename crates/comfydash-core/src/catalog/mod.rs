//! Model catalog scanning.
//!
//! Walks the ComfyUI model directories, fingerprints each file, reads
//! safetensors training metadata and derives the dashboard's catalog fields.

pub mod categories;
pub mod classifier;
pub mod extractor;
pub mod fingerprint;
pub mod header;
mod scanner;
mod store;
mod types;
pub mod walker;

pub use fingerprint::{Fingerprint, Sampling};
pub use header::{HeaderMetadata, MetadataValue};
pub use scanner::{resolve_root, CatalogScanner};
pub use store::{read_catalog, write_catalog};
pub use types::{
    BaseModel, BaseModelSource, Catalog, CatalogItem, Category, Confidence, Presets, ScanOutcome,
    SkippedEntry, Suitability,
};
