//! Safetensors header metadata.
//!
//! Safetensors layout:
//! - 0-7: header size (u64, little-endian)
//! - 8+: JSON header. Tensor entries plus an optional `__metadata__` object
//!   holding string key/value pairs written by training tools.
//!
//! Metadata is an enrichment, so every failure here reads as "no metadata".

use crate::config::ScannerConfig;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Reserved header key holding free-form metadata.
const METADATA_KEY: &str = "__metadata__";

/// A metadata value. Shapes other than text and mappings are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Nested(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    /// Convert a JSON value, dropping numbers, booleans, arrays and nulls.
    fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(MetadataValue::Text(s)),
            Value::Object(map) => Some(MetadataValue::Nested(convert_object(map))),
            _ => None,
        }
    }

    /// The string value, or `None` for a nested mapping.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Nested(_) => None,
        }
    }
}

fn convert_object(map: serde_json::Map<String, Value>) -> BTreeMap<String, MetadataValue> {
    map.into_iter()
        .filter_map(|(k, v)| MetadataValue::from_json(v).map(|v| (k, v)))
        .collect()
}

/// Parsed `__metadata__` mapping of a safetensors file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMetadata {
    entries: BTreeMap<String, MetadataValue>,
}

impl HeaderMetadata {
    /// Value of `key`, whatever its shape.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    /// Text value of `key`. Missing keys and nested values read as `None`.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_text)
    }

    /// Number of usable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no usable entries were found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, MetadataValue)> for HeaderMetadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Why a header yielded no metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMiss {
    /// Fewer than 8 bytes available
    TooShort,
    /// Declared size above `ScannerConfig::MAX_HEADER_BYTES`
    TooLarge(u64),
    /// File ended before the declared header did
    Truncated,
    /// Header is not a JSON object
    Malformed(String),
    /// Header parsed but carries no `__metadata__` object
    Absent,
}

impl std::fmt::Display for HeaderMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderMiss::TooShort => write!(f, "shorter than the 8-byte size prefix"),
            HeaderMiss::TooLarge(n) => write!(f, "declared header size {} exceeds limit", n),
            HeaderMiss::Truncated => write!(f, "header truncated"),
            HeaderMiss::Malformed(e) => write!(f, "malformed header: {}", e),
            HeaderMiss::Absent => write!(f, "no __metadata__ field"),
        }
    }
}

/// Parse the metadata block from a safetensors stream positioned at byte 0.
pub fn parse_header<R: Read>(reader: &mut R) -> Result<HeaderMetadata, HeaderMiss> {
    let mut size_buf = [0u8; 8];
    reader
        .read_exact(&mut size_buf)
        .map_err(|_| HeaderMiss::TooShort)?;
    let header_size = u64::from_le_bytes(size_buf);

    if header_size > ScannerConfig::MAX_HEADER_BYTES {
        return Err(HeaderMiss::TooLarge(header_size));
    }

    let mut header_buf = vec![0u8; header_size as usize];
    reader
        .read_exact(&mut header_buf)
        .map_err(|_| HeaderMiss::Truncated)?;

    let header: Value =
        serde_json::from_slice(&header_buf).map_err(|e| HeaderMiss::Malformed(e.to_string()))?;

    let Value::Object(mut header) = header else {
        return Err(HeaderMiss::Malformed("top level is not an object".into()));
    };

    match header.remove(METADATA_KEY) {
        Some(Value::Object(map)) => Ok(HeaderMetadata {
            entries: convert_object(map),
        }),
        _ => Err(HeaderMiss::Absent),
    }
}

/// Read header metadata from a safetensors file.
///
/// Returns `None` when the file can't be opened or the header can't be used.
pub fn read_header_metadata(path: &Path) -> Option<HeaderMetadata> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Cannot open {} for header: {}", path.display(), e);
            return None;
        }
    };

    match parse_header(&mut file) {
        Ok(metadata) => Some(metadata),
        Err(miss) => {
            debug!("No header metadata in {}: {}", path.display(), miss);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn container(json: &str) -> Vec<u8> {
        let mut bytes = (json.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(json.as_bytes());
        bytes
    }

    #[test]
    fn test_parse_metadata() {
        let bytes = container(
            r#"{"__metadata__":{"ss_base_model_version":"sdxl_base_v1-0","ss_epoch":"4"},
                "w":{"dtype":"F16","shape":[1],"data_offsets":[0,2]}}"#,
        );
        let metadata = parse_header(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get_text("ss_base_model_version"), Some("sdxl_base_v1-0"));
        assert_eq!(metadata.get_text("missing"), None);
    }

    #[test]
    fn test_short_input_is_no_metadata() {
        let result = parse_header(&mut Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(result, Err(HeaderMiss::TooShort));
    }

    #[test]
    fn test_oversized_header_is_rejected() {
        let bytes = (ScannerConfig::MAX_HEADER_BYTES + 1).to_le_bytes().to_vec();
        let result = parse_header(&mut Cursor::new(bytes));
        assert_eq!(result, Err(HeaderMiss::TooLarge(10_000_001)));
    }

    #[test]
    fn test_truncated_header() {
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{\"__meta");
        assert_eq!(parse_header(&mut Cursor::new(bytes)), Err(HeaderMiss::Truncated));
    }

    #[test]
    fn test_malformed_json() {
        let bytes = container("{not json");
        assert!(matches!(
            parse_header(&mut Cursor::new(bytes)),
            Err(HeaderMiss::Malformed(_))
        ));
    }

    #[test]
    fn test_header_without_metadata() {
        let bytes = container(r#"{"w":{"dtype":"F16","shape":[1],"data_offsets":[0,2]}}"#);
        assert_eq!(parse_header(&mut Cursor::new(bytes)), Err(HeaderMiss::Absent));
    }

    #[test]
    fn test_mismatched_value_shapes_read_as_absent() {
        let bytes = container(
            r#"{"__metadata__":{"n":3,"b":true,"a":[1],"z":null,"nested":{"k":"v"},"s":"ok"}}"#,
        );
        let metadata = parse_header(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(metadata.get("n"), None);
        assert_eq!(metadata.get("b"), None);
        assert_eq!(metadata.get("a"), None);
        assert_eq!(metadata.get("z"), None);
        assert_eq!(metadata.get_text("nested"), None);
        assert!(matches!(metadata.get("nested"), Some(MetadataValue::Nested(_))));
        assert_eq!(metadata.get_text("s"), Some("ok"));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&container(r#"{"__metadata__":{"ss_sd_model_name":"v1-5.ckpt"}}"#))
            .unwrap();
        file.flush().unwrap();

        let metadata = read_header_metadata(file.path()).unwrap();
        assert_eq!(metadata.get_text("ss_sd_model_name"), Some("v1-5.ckpt"));
    }

    #[test]
    fn test_read_from_tiny_file_is_none() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();
        assert!(read_header_metadata(file.path()).is_none());
    }

    #[test]
    fn test_read_missing_file_is_none() {
        assert!(read_header_metadata(Path::new("/definitely/not/here.safetensors")).is_none());
    }
}
