//! ComfyDash Core - Headless scanner that catalogs ComfyUI model files.
//!
//! Walks the checkpoint, LoRA and embedding directories of a ComfyUI
//! installation and produces a versioned, deterministically ordered catalog
//! for the dashboard. It can be used programmatically without any HTTP
//! layer; the `comfydash-scan` binary is a thin wrapper around it.
//!
//! # Example
//!
//! ```rust,no_run
//! use comfydash_core::{CatalogScanner, Category, ScanRequest};
//!
//! fn main() -> comfydash_core::Result<()> {
//!     let request = ScanRequest::new("~/ComfyUI").persist(false);
//!     let outcome = CatalogScanner::scan(&request)?;
//!
//!     println!("Found {} LoRAs", outcome.catalog.count(Category::Lora));
//!     for entry in &outcome.skipped {
//!         println!("skipped {}: {}", entry.path.display(), entry.reason);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use cancel::{CancellationToken, CancelledError};
pub use catalog::{
    read_catalog, write_catalog, BaseModel, BaseModelSource, Catalog, CatalogItem,
    CatalogScanner, Category, Confidence, Presets, ScanOutcome, SkippedEntry, Suitability,
};
pub use config::{ScanRequest, ScannerConfig};
pub use error::{Result, ScanError};
pub use progress::{ProgressReporter, SilentReporter};
