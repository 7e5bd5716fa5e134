//! Centralized configuration for the scanner.
//!
//! Fixed tunables live on `ScannerConfig`; per-invocation inputs are carried
//! by `ScanRequest` so that nothing about a scan lives in global state.

use crate::progress::ProgressReporter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Scanner-wide constants.
pub struct ScannerConfig;

impl ScannerConfig {
    /// Version stamped into every catalog document.
    pub const SCHEMA_VERSION: u32 = 1;
    /// Root identifier written into catalogs (single-root deployments).
    pub const ROOT_ID: &'static str = "default";
    /// Catalog filename used when no output path is given.
    pub const DEFAULT_CATALOG_FILENAME: &'static str = "catalog.json";

    /// Bytes sampled from each end of a file for its fingerprint.
    pub const SAMPLE_WINDOW: usize = 64 * 1024;
    /// Digest width of a fingerprint, in bytes.
    pub const FINGERPRINT_BYTES: usize = 16;

    /// Largest safetensors header we are willing to read (10MB).
    pub const MAX_HEADER_BYTES: u64 = 10_000_000;

    /// Number of tag names kept in a LoRA tag summary.
    pub const TOP_TAG_LIMIT: usize = 15;

    /// Files processed concurrently by the async scanner.
    pub const DEFAULT_MAX_WORKERS: usize = 4;
}

/// Input for a single catalog scan.
#[derive(Clone)]
pub struct ScanRequest {
    /// Directory to scan, possibly starting with `~`.
    pub root: PathBuf,
    /// Where to persist the catalog. `None` means `<root>/catalog.json`.
    pub output: Option<PathBuf>,
    /// Whether to write the catalog at all.
    pub persist: bool,
    /// Upper bound on files processed concurrently (async scans only).
    pub max_workers: usize,
    /// Receives per-category progress, if set.
    pub progress: Option<Arc<dyn ProgressReporter>>,
}

impl std::fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanRequest")
            .field("root", &self.root)
            .field("output", &self.output)
            .field("persist", &self.persist)
            .field("max_workers", &self.max_workers)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ScanRequest {
    /// Create a request that scans `root` and persists to the default path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: None,
            persist: true,
            max_workers: ScannerConfig::DEFAULT_MAX_WORKERS,
            progress: None,
        }
    }

    /// Persist to `output` instead of `<root>/catalog.json`.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set whether the catalog is written.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Bound concurrent file processing. Zero is raised to one.
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    /// Report per-category progress to `reporter`.
    pub fn with_progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    /// Resolve the output path for an already-resolved scan root.
    pub fn output_path(&self, resolved_root: &Path) -> PathBuf {
        match &self.output {
            Some(path) => expand_home(path),
            None => resolved_root.join(ScannerConfig::DEFAULT_CATALOG_FILENAME),
        }
    }
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~`, and every path when no home directory can
/// be determined, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = ScanRequest::new("/models");
        assert!(req.persist);
        assert!(req.output.is_none());
        assert_eq!(req.max_workers, ScannerConfig::DEFAULT_MAX_WORKERS);
        assert_eq!(
            req.output_path(Path::new("/models")),
            PathBuf::from("/models/catalog.json")
        );
    }

    #[test]
    fn test_progress_is_optional() {
        let req = ScanRequest::new("/models");
        assert!(req.progress.is_none());
        let req = req.with_progress(Arc::new(crate::progress::SilentReporter));
        assert!(req.progress.is_some());
        assert!(format!("{:?}", req).contains("progress: true"));
    }

    #[test]
    fn test_max_workers_never_zero() {
        let req = ScanRequest::new("/models").max_workers(0);
        assert_eq!(req.max_workers, 1);
    }

    #[test]
    fn test_explicit_output_wins() {
        let req = ScanRequest::new("/models").with_output("/tmp/out.json");
        assert_eq!(
            req.output_path(Path::new("/models")),
            PathBuf::from("/tmp/out.json")
        );
    }

    #[test]
    fn test_expand_home_leaves_plain_paths() {
        assert_eq!(expand_home(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        assert_eq!(expand_home(Path::new("rel/~x")), PathBuf::from("rel/~x"));
    }

    #[test]
    fn test_expand_home_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/ComfyUI")), home.join("ComfyUI"));
        }
    }

    #[test]
    fn test_window_constants_are_consistent() {
        assert_eq!(ScannerConfig::SAMPLE_WINDOW, 65_536);
        assert!(ScannerConfig::MAX_HEADER_BYTES > ScannerConfig::SAMPLE_WINDOW as u64);
    }
}
