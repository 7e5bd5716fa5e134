//! Stable fingerprints for model files.
//!
//! A fingerprint hashes `name|size|mtime` plus up to two sparse content
//! samples (the first and last `SAMPLE_WINDOW` bytes), so multi-gigabyte
//! checkpoints are identified without reading them end to end. It is a fast
//! catalog key, not an integrity check.

use crate::config::ScannerConfig;
use blake3::Hasher as Blake3Hasher;
use std::fs::{File, Metadata};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::debug;

/// How much of the file went into a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Basis plus every content sample the file size calls for.
    Sampled,
    /// Content could not be read; the id covers the basis alone.
    BasisOnly(ErrorKind),
}

/// A computed fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Lowercase hex digest
    pub id: String,
    pub sampling: Sampling,
}

/// Modification time in nanoseconds since the Unix epoch.
///
/// Returns 0 when the platform has no mtime or it predates the epoch.
pub fn mtime_nanos(metadata: &Metadata) -> u128 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Compute the fingerprint of the file at `path`.
///
/// `file_name`, `size` and `mtime_nanos` form the basis and are taken from
/// the caller's stat of the file. Content sampling is best-effort: if the
/// file cannot be read the result is a basis-only fingerprint, never an
/// error.
pub fn fingerprint(path: &Path, file_name: &str, size: u64, mtime_nanos: u128) -> Fingerprint {
    let mut hasher = Blake3Hasher::new();
    hasher.update(format!("{}|{}|{}", file_name, size, mtime_nanos).as_bytes());

    let sampling = if size == 0 {
        Sampling::Sampled
    } else {
        // Samples are read in full before hashing so a failed read can't
        // leave a partially fed hasher behind.
        match read_samples(path, size) {
            Ok(samples) => {
                for sample in &samples {
                    hasher.update(sample);
                }
                Sampling::Sampled
            }
            Err(e) => {
                debug!("Fingerprint sampling failed for {}: {}", path.display(), e);
                Sampling::BasisOnly(e.kind())
            }
        }
    };

    Fingerprint {
        id: finish(&hasher),
        sampling,
    }
}

fn read_samples(path: &Path, size: u64) -> io::Result<Vec<Vec<u8>>> {
    let window = ScannerConfig::SAMPLE_WINDOW as u64;
    let mut file = File::open(path)?;

    let mut head = vec![0u8; size.min(window) as usize];
    file.read_exact(&mut head)?;
    let mut samples = vec![head];

    if size > window * 2 {
        file.seek(SeekFrom::Start(size - window))?;
        let mut tail = vec![0u8; ScannerConfig::SAMPLE_WINDOW];
        file.read_exact(&mut tail)?;
        samples.push(tail);
    }

    Ok(samples)
}

fn finish(hasher: &Blake3Hasher) -> String {
    let mut digest = [0u8; ScannerConfig::FINGERPRINT_BYTES];
    hasher.finalize_xof().fill(&mut digest);
    hex::encode(digest)
}
