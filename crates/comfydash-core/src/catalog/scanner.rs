//! Catalog assembly.
//!
//! A scan resolves the root, walks the category directories, builds one
//! `CatalogItem` per discovered file, sorts the result and optionally
//! persists it. Per-file failures become `SkippedEntry` diagnostics; only a
//! bad root (or cancellation, or a failed write) fails the scan.

use super::categories;
use super::classifier::{infer_base_model, presets_for, suitability};
use super::extractor::{extract, Extracted};
use super::fingerprint::{fingerprint, mtime_nanos, Sampling};
use super::header::read_header_metadata;
use super::store::write_catalog;
use super::types::{Catalog, CatalogItem, Category, ScanOutcome, SkippedEntry};
use super::walker::{self, DiscoveredFile};
use crate::cancel::CancellationToken;
use crate::config::{expand_home, ScanRequest, ScannerConfig};
use crate::error::{Result, ScanError};
use crate::progress::ProgressReporter;
use chrono::{DateTime, SubsecRound, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::{debug, info, warn};

/// Builds catalogs from a ComfyUI installation.
pub struct CatalogScanner;

impl CatalogScanner {
    /// Scan sequentially on the calling thread.
    pub fn scan(request: &ScanRequest) -> Result<ScanOutcome> {
        let root = resolve_root(&request.root)?;
        info!("Scanning models under {}", root.display());

        let walk = walker::discover(&root);
        let mut skipped = walk.skipped;
        let mut items = Vec::with_capacity(walk.files.len());
        let mut tally = ProgressTally::start(request.progress.as_deref(), &walk.files);

        for file in &walk.files {
            match build_item(&root, file) {
                Ok(item) => items.push(item),
                Err(entry) => skipped.push(entry),
            }
            tally.advance(file.category);
        }
        tally.finish(items.len(), skipped.len());

        let catalog = assemble(&root, items);
        let written_to = if request.persist {
            let path = request.output_path(&root);
            write_catalog(&path, &catalog)?;
            Some(path)
        } else {
            None
        };

        log_finished(&catalog, &skipped, written_to.as_deref());
        Ok(ScanOutcome {
            catalog,
            skipped,
            written_to,
        })
    }

    /// Scan on tokio's blocking pool with at most `request.max_workers`
    /// files in flight.
    ///
    /// The token is checked before each file and again before persisting.
    /// A cancelled scan returns `ScanError::Cancelled` and leaves the
    /// destination untouched.
    pub async fn scan_async(
        request: ScanRequest,
        cancel: CancellationToken,
    ) -> Result<ScanOutcome> {
        cancel.check()?;

        let requested_root = request.root.clone();
        let root = tokio::task::spawn_blocking(move || resolve_root(&requested_root))
            .await
            .map_err(|e| ScanError::Other(format!("Scan task failed: {}", e)))??;
        info!("Scanning models under {}", root.display());

        let walk_root = root.clone();
        let walk = tokio::task::spawn_blocking(move || walker::discover(&walk_root))
            .await
            .map_err(|e| ScanError::Other(format!("Directory walk failed: {}", e)))?;

        let mut skipped = walk.skipped;
        let mut items = Vec::with_capacity(walk.files.len());
        let mut tally = ProgressTally::start(request.progress.as_deref(), &walk.files);

        let mut results = stream::iter(walk.files)
            .map(|file| {
                let root = root.clone();
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    let category = file.category;
                    tokio::task::spawn_blocking(move || build_item(&root, &file))
                        .await
                        .map(|built| Some((category, built)))
                }
            })
            .buffer_unordered(request.max_workers.max(1));

        while let Some(result) = results.next().await {
            match result {
                Ok(Some((category, built))) => {
                    match built {
                        Ok(item) => items.push(item),
                        Err(entry) => skipped.push(entry),
                    }
                    tally.advance(category);
                }
                Ok(None) => {}
                Err(e) => return Err(ScanError::Other(format!("Scan worker failed: {}", e))),
            }
        }

        tally.finish(items.len(), skipped.len());
        cancel.check()?;
        let catalog = assemble(&root, items);

        let written_to = if request.persist {
            let path = request.output_path(&root);
            cancel.check()?;
            let write_path = path.clone();
            let to_write = catalog.clone();
            tokio::task::spawn_blocking(move || write_catalog(&write_path, &to_write))
                .await
                .map_err(|e| ScanError::Other(format!("Catalog write failed: {}", e)))??;
            Some(path)
        } else {
            None
        };

        log_finished(&catalog, &skipped, written_to.as_deref());
        Ok(ScanOutcome {
            catalog,
            skipped,
            written_to,
        })
    }
}

/// Expand `~`, check the root is an existing directory and canonicalize it.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = expand_home(root);
    let metadata = match fs::metadata(&root) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(ScanError::RootNotFound(root)),
        Err(e) => return Err(ScanError::io_with_path(e, root)),
    };
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root));
    }
    fs::canonicalize(&root).map_err(|e| ScanError::io_with_path(e, root))
}

/// Build the catalog entry for one discovered file.
fn build_item(root: &Path, file: &DiscoveredFile) -> std::result::Result<CatalogItem, SkippedEntry> {
    let path = &file.path;
    let metadata = fs::metadata(path).map_err(|e| {
        warn!("Skipping {}: {}", path.display(), e);
        SkippedEntry {
            path: path.clone(),
            reason: e.to_string(),
        }
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let display_name = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());
    let size = metadata.len();

    let fp = fingerprint(path, &file_name, size, mtime_nanos(&metadata));
    match fp.sampling {
        Sampling::Sampled => {}
        // Could not open the file at all: treat like any other unreadable entry.
        Sampling::BasisOnly(kind @ (ErrorKind::PermissionDenied | ErrorKind::NotFound)) => {
            warn!("Skipping {}: cannot read file ({})", path.display(), kind);
            return Err(SkippedEntry {
                path: path.clone(),
                reason: format!("cannot read file: {}", kind),
            });
        }
        Sampling::BasisOnly(kind) => {
            debug!(
                "{} fingerprinted from name, size and mtime only ({})",
                path.display(),
                kind
            );
        }
    }

    let header = if categories::is_safetensors(path) {
        read_header_metadata(path)
    } else {
        None
    };

    let guess = infer_base_model(&file_name, header.as_ref());
    let (suitability, presets) = if file.category == Category::Checkpoint {
        let suit = suitability(&file_name, guess.base_model);
        (Some(suit), Some(presets_for(guess.base_model, suit.drawing)))
    } else {
        (None, None)
    };

    let Extracted {
        trigger_word,
        top_tags,
        source_url,
    } = header
        .as_ref()
        .map(|m| extract(m, file.category == Category::Lora))
        .unwrap_or_default();

    let rel_path = path.strip_prefix(root).unwrap_or(path);
    let modified_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_default();

    Ok(CatalogItem {
        id: fp.id,
        category: file.category,
        display_name,
        file_name,
        path: slash_path(path),
        rel_path: slash_path(rel_path),
        size,
        modified_at,
        base_model: guess.base_model,
        base_model_source: guess.source,
        confidence: guess.confidence,
        suitability,
        presets,
        trigger_word,
        top_tags,
        source_url,
    })
}

/// Sort items and wrap them in the catalog envelope.
fn assemble(root: &Path, mut items: Vec<CatalogItem>) -> Catalog {
    items.sort_by_cached_key(CatalogItem::sort_key);
    Catalog {
        schema_version: ScannerConfig::SCHEMA_VERSION,
        generated_at: Utc::now().trunc_subsecs(0),
        root_id: ScannerConfig::ROOT_ID.to_string(),
        root_path: slash_path(root),
        item_count: items.len(),
        items,
    }
}

/// Per-category processed/total counts forwarded to a `ProgressReporter`.
struct ProgressTally<'a> {
    reporter: Option<&'a dyn ProgressReporter>,
    counts: BTreeMap<Category, (usize, usize)>,
}

impl<'a> ProgressTally<'a> {
    fn start(reporter: Option<&'a dyn ProgressReporter>, files: &[DiscoveredFile]) -> Self {
        let mut counts: BTreeMap<Category, (usize, usize)> =
            Category::ALL.iter().map(|c| (*c, (0, 0))).collect();
        for file in files {
            if let Some((_, total)) = counts.get_mut(&file.category) {
                *total += 1;
            }
        }
        if let Some(reporter) = reporter {
            for (category, (done, total)) in &counts {
                reporter.on_category_progress(*category, *done, *total);
            }
        }
        Self { reporter, counts }
    }

    fn advance(&mut self, category: Category) {
        let Some((done, total)) = self.counts.get_mut(&category) else {
            return;
        };
        *done += 1;
        if let Some(reporter) = self.reporter {
            reporter.on_category_progress(category, *done, *total);
        }
    }

    fn finish(&self, cataloged: usize, skipped: usize) {
        if let Some(reporter) = self.reporter {
            reporter.on_scan_complete(cataloged, skipped);
        }
    }
}

fn slash_path(path: &Path) -> String {
    let text = path.to_string_lossy();
    if MAIN_SEPARATOR == '/' {
        text.into_owned()
    } else {
        text.replace(MAIN_SEPARATOR, "/")
    }
}

fn log_finished(catalog: &Catalog, skipped: &[SkippedEntry], written_to: Option<&Path>) {
    info!(
        "Cataloged {} models ({} checkpoints, {} loras, {} embeddings), {} skipped",
        catalog.item_count,
        catalog.count(Category::Checkpoint),
        catalog.count(Category::Lora),
        catalog.count(Category::Embedding),
        skipped.len()
    );
    if let Some(path) = written_to {
        info!("Catalog written to {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{BaseModel, BaseModelSource, Confidence};
    use tempfile::TempDir;

    fn touch(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn safetensors(metadata_json: &str) -> Vec<u8> {
        let header = format!("{{\"__metadata__\":{}}}", metadata_json);
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(header.as_bytes());
        bytes
    }

    #[test]
    fn test_resolve_root_errors() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(resolve_root(&missing), Err(ScanError::RootNotFound(_))));

        let file = tmp.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(resolve_root(&file), Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_build_item_checkpoint_fields() {
        let tmp = TempDir::new().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        let path = root.join("models/checkpoints/sub/JuggernautXL_v9.safetensors");
        touch(&path, b"not a real header");

        let item = build_item(
            &root,
            &DiscoveredFile {
                category: Category::Checkpoint,
                path: path.clone(),
            },
        )
        .unwrap();

        assert_eq!(item.display_name, "JuggernautXL_v9");
        assert_eq!(item.file_name, "JuggernautXL_v9.safetensors");
        assert_eq!(item.rel_path, "models/checkpoints/sub/JuggernautXL_v9.safetensors");
        assert_eq!(item.size, 17);
        assert_eq!(item.base_model, BaseModel::Sdxl);
        assert_eq!(item.base_model_source, BaseModelSource::Filename);
        assert_eq!(item.confidence, Confidence::Medium);
        assert!(item.suitability.unwrap().photo);
        assert_eq!(item.presets.unwrap().steps, 36);
        assert!(item.trigger_word.is_none());
    }

    #[test]
    fn test_build_item_lora_metadata() {
        let tmp = TempDir::new().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        let path = root.join("models/loras/mychar.safetensors");
        touch(
            &path,
            &safetensors(
                r#"{"ss_training_comment":"trigger word: mychar, other text","ss_base_model_version":"sdxl_base_v1-0"}"#,
            ),
        );

        let item = build_item(
            &root,
            &DiscoveredFile {
                category: Category::Lora,
                path,
            },
        )
        .unwrap();

        assert_eq!(item.trigger_word.as_deref(), Some("mychar"));
        assert_eq!(item.base_model, BaseModel::Sdxl);
        assert_eq!(item.confidence, Confidence::High);
        assert!(item.suitability.is_none());
        assert!(item.presets.is_none());
    }

    #[test]
    fn test_vanished_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("models/loras/gone.safetensors");
        let entry = build_item(
            tmp.path(),
            &DiscoveredFile {
                category: Category::Lora,
                path: path.clone(),
            },
        )
        .unwrap_err();
        assert_eq!(entry.path, path);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        let path = root.join("models/loras/locked.safetensors");
        touch(&path, b"locked content");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Mode bits don't stop root; nothing to check then.
        if fs::File::open(&path).is_ok() {
            return;
        }

        let entry = build_item(
            &root,
            &DiscoveredFile {
                category: Category::Lora,
                path: path.clone(),
            },
        )
        .unwrap_err();
        assert_eq!(entry.path, path);
        assert!(entry.reason.contains("permission denied"));
    }

    #[test]
    fn test_progress_tally_counts_per_category() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder {
            calls: Mutex<Vec<(Category, usize, usize)>>,
            finished: Mutex<Option<(usize, usize)>>,
        }
        impl ProgressReporter for Recorder {
            fn on_category_progress(&self, category: Category, done: usize, total: usize) {
                self.calls.lock().unwrap().push((category, done, total));
            }
            fn on_scan_complete(&self, cataloged: usize, skipped: usize) {
                *self.finished.lock().unwrap() = Some((cataloged, skipped));
            }
        }

        let files = vec![
            DiscoveredFile {
                category: Category::Lora,
                path: PathBuf::from("a"),
            },
            DiscoveredFile {
                category: Category::Lora,
                path: PathBuf::from("b"),
            },
        ];
        let recorder = Recorder::default();
        let mut tally = ProgressTally::start(Some(&recorder), &files);
        tally.advance(Category::Lora);
        tally.advance(Category::Lora);
        tally.finish(1, 1);

        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![
                (Category::Checkpoint, 0, 0),
                (Category::Lora, 0, 2),
                (Category::Embedding, 0, 0),
                (Category::Lora, 1, 2),
                (Category::Lora, 2, 2),
            ]
        );
        assert_eq!(*recorder.finished.lock().unwrap(), Some((1, 1)));
    }

    #[test]
    fn test_non_safetensors_skip_header() {
        let tmp = TempDir::new().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        // A .ckpt that happens to look like a safetensors container.
        let path = root.join("models/checkpoints/model.ckpt");
        touch(&path, &safetensors(r#"{"ss_base_model_version":"sdxl"}"#));

        let item = build_item(
            &root,
            &DiscoveredFile {
                category: Category::Checkpoint,
                path,
            },
        )
        .unwrap();
        assert_eq!(item.base_model, BaseModel::Sd15);
        assert_eq!(item.base_model_source, BaseModelSource::Filename);
    }

    #[test]
    fn test_assemble_sorts_and_counts() {
        let tmp = TempDir::new().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        for rel in [
            "models/embeddings/a.pt",
            "models/loras/Zeta.safetensors",
            "models/loras/alpha.safetensors",
            "models/checkpoints/m.ckpt",
        ] {
            touch(&root.join(rel), b"x");
        }

        let outcome = CatalogScanner::scan(&ScanRequest::new(&root).persist(false)).unwrap();
        let order: Vec<&str> = outcome
            .catalog
            .items
            .iter()
            .map(|i| i.display_name.as_str())
            .collect();
        assert_eq!(order, vec!["m", "alpha", "Zeta", "a"]);
        assert_eq!(outcome.catalog.item_count, 4);
        assert_eq!(outcome.catalog.generated_at.timestamp_subsec_nanos(), 0);
        assert!(outcome.written_to.is_none());
    }
}
