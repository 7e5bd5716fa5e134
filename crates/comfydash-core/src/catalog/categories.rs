//! Where each model category lives and which files belong to it.

use super::types::Category;
use std::path::Path;

/// Extension of the tensor container whose header we parse.
pub const SAFETENSORS_EXTENSION: &str = "safetensors";

/// Candidate subdirectories (relative to the scan root) for a category.
pub fn subdirectories(category: Category) -> &'static [&'static str] {
    match category {
        Category::Checkpoint => &["models/checkpoints"],
        Category::Lora => &["models/loras"],
        Category::Embedding => &["models/embeddings"],
    }
}

/// Accepted file extensions (lowercase, without the dot) for a category.
pub fn extensions(category: Category) -> &'static [&'static str] {
    match category {
        Category::Checkpoint => &["safetensors", "ckpt"],
        Category::Lora => &["safetensors"],
        Category::Embedding => &["pt", "bin"],
    }
}

/// Lowercased extension of a path, if it has one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether `path` has an extension accepted for `category`.
pub fn accepts(category: Category, path: &Path) -> bool {
    extension_of(path)
        .map(|ext| extensions(category).contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Whether `path` is a safetensors container.
pub fn is_safetensors(path: &Path) -> bool {
    extension_of(path).as_deref() == Some(SAFETENSORS_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_match_is_case_insensitive() {
        assert!(accepts(Category::Checkpoint, Path::new("a/Model.SafeTensors")));
        assert!(accepts(Category::Checkpoint, Path::new("a/old.CKPT")));
        assert!(accepts(Category::Embedding, Path::new("neg.PT")));
    }

    #[test]
    fn test_extension_is_category_specific() {
        assert!(!accepts(Category::Lora, Path::new("style.ckpt")));
        assert!(!accepts(Category::Embedding, Path::new("emb.safetensors")));
        assert!(!accepts(Category::Checkpoint, Path::new("README")));
    }

    #[test]
    fn test_every_category_has_a_directory() {
        for category in Category::ALL {
            assert!(!subdirectories(category).is_empty());
            assert!(!extensions(category).is_empty());
        }
    }

    #[test]
    fn test_is_safetensors() {
        assert!(is_safetensors(Path::new("x.safetensors")));
        assert!(!is_safetensors(Path::new("x.ckpt")));
        assert!(!is_safetensors(Path::new("safetensors")));
    }
}
