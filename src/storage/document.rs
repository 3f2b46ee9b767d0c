//! Library document load/save.
//!
//! The whole library lives in one JSON file. Every save serialises the
//! complete document and replaces the file; there is no incremental write.

use std::path::Path;

use super::{LibraryDocument, StorageError};

/// Read the library document, creating an empty one on first start.
pub(super) fn load_or_init(path: &Path) -> Result<LibraryDocument, StorageError> {
    if !path.exists() {
        let doc = LibraryDocument::default();
        save(path, &doc)?;
        tracing::info!("Created empty library document at {}", path.display());
        return Ok(doc);
    }

    let content = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
        context: format!("failed to read {}", path.display()),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialise and overwrite the document.
///
/// The bytes go to a sibling `.tmp` file first and are renamed over the
/// target, so readers never observe a half-written document.
pub(super) fn save(path: &Path, doc: &LibraryDocument) -> Result<(), StorageError> {
    let s = serde_json::to_string_pretty(doc).map_err(StorageError::Serialize)?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, s).map_err(|source| StorageError::Io {
        context: format!("failed to write {}", tmp_path.display()),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| StorageError::Io {
        context: format!("failed to replace {}", path.display()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let doc = load_or_init(&path).unwrap();
        assert_eq!(doc, LibraryDocument::default());

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::json!({ "images": [], "tags": [] }));
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_or_init(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let mut doc = LibraryDocument::default();
        doc.tags.push("sky".into());

        save(&path, &doc).unwrap();

        assert!(!dir.path().join("db.json.tmp").exists());
        assert_eq!(load_or_init(&path).unwrap(), doc);
    }
}
