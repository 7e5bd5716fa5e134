//! Atomic catalog persistence.
//!
//! Writes go to a temp file in the destination directory, are synced, then
//! renamed over the target, so readers see either the old catalog or the
//! new one and never a partial document.

use super::types::Catalog;
use crate::error::{Result, ScanError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Read a catalog document.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn read_catalog(path: &Path) -> Result<Option<Catalog>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ScanError::Io {
                message: format!("Failed to read {}", path.display()),
                path: Some(path.to_path_buf()),
                source: Some(e),
            })
        }
    };

    let catalog = serde_json::from_str(&contents).map_err(|e| ScanError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(catalog))
}

/// Write a catalog document atomically, creating parent directories.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| ScanError::Io {
        message: format!("Failed to create directory {}", parent.display()),
        path: Some(parent.to_path_buf()),
        source: Some(e),
    })?;

    let serialized = serde_json::to_string_pretty(catalog).map_err(|e| ScanError::Json {
        message: format!("Failed to serialize catalog: {}", e),
        source: Some(e),
    })?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| ScanError::Io {
        message: format!("Failed to create temp file in {}", parent.display()),
        path: Some(parent.to_path_buf()),
        source: Some(e),
    })?;

    if let Err(e) = write_synced(&mut temp, serialized.as_bytes()) {
        return Err(ScanError::Io {
            message: format!("Failed to write temp file {}", temp.path().display()),
            path: Some(temp.path().to_path_buf()),
            source: Some(e),
        });
    }

    temp.persist(path).map_err(|e| ScanError::Io {
        message: format!("Failed to replace {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e.error),
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn write_synced(temp: &mut NamedTempFile, contents: &[u8]) -> std::io::Result<()> {
    temp.write_all(contents)?;
    temp.write_all(b"\n")?;
    temp.flush()?;
    temp.as_file().sync_all()
}
