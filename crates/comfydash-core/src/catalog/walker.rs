//! Discovery of candidate model files under a scan root.

use super::categories;
use super::types::{Category, SkippedEntry};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A file found in a category directory with an accepted extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub category: Category,
    pub path: PathBuf,
}

/// Files found by a walk plus the entries that had to be skipped.
#[derive(Debug, Default)]
pub struct WalkResult {
    pub files: Vec<DiscoveredFile>,
    pub skipped: Vec<SkippedEntry>,
}

/// Walk every category directory under `root`.
///
/// Missing category directories are skipped silently. Unreadable entries
/// and symlink loops are recorded in `skipped` and the walk continues.
pub fn discover(root: &Path) -> WalkResult {
    let mut result = WalkResult::default();

    for category in Category::ALL {
        for rel in categories::subdirectories(category) {
            let dirs = resolve_case_variants(root, rel);
            if dirs.is_empty() {
                debug!("No {} directory at {}", category, root.join(rel).display());
            }
            for dir in dirs {
                walk_category_dir(&dir, category, &mut result);
            }
        }
    }

    result
}

/// Resolve a `/`-separated relative directory, matching each segment
/// case-insensitively against what exists on disk.
///
/// Sibling spellings (`models/Loras` and `models/loras`) all resolve;
/// aliases of the same directory are returned once.
pub fn resolve_case_variants(root: &Path, rel: &str) -> Vec<PathBuf> {
    let mut current = vec![root.to_path_buf()];

    for segment in rel.split('/').filter(|s| !s.is_empty()) {
        let mut next = Vec::new();
        for dir in &current {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            let mut matched: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .is_some_and(|name| name.eq_ignore_ascii_case(segment))
                })
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            matched.sort();
            next.extend(matched);
        }
        current = next;
    }

    let mut seen = HashSet::new();
    current.retain(|p| seen.insert(fs::canonicalize(p).unwrap_or_else(|_| p.clone())));
    current
}

fn walk_category_dir(dir: &Path, category: Category, result: &mut WalkResult) {
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && categories::accepts(category, entry.path()) {
                    result.files.push(DiscoveredFile {
                        category,
                        path: entry.into_path(),
                    });
                }
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf());
                let reason = match err.loop_ancestor() {
                    Some(ancestor) => format!("symlink loop back to {}", ancestor.display()),
                    None => err.to_string(),
                };
                warn!("Skipping {}: {}", path.display(), reason);
                result.skipped.push(SkippedEntry { path, reason });
            }
        }
    }
}
