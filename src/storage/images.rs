//! Image record CRUD operations (append, get, replace tags, remove).

use super::{document, ImageRecord, LibraryDocument, StorageError, StorageState};

impl StorageState {
    pub fn get_image(&self, id: &str) -> Option<ImageRecord> {
        let guard = self.lock_document("get_image");
        guard.images.iter().find(|image| image.id == id).cloned()
    }

    /// Add a record and persist. The record's tags join the tag index.
    pub fn append_image(&self, record: ImageRecord) -> Result<ImageRecord, StorageError> {
        let mut guard = self.lock_document("append_image");
        if guard.position(&record.id).is_some() {
            return Err(StorageError::DuplicateId(record.id));
        }

        let mut next = guard.clone();
        next.remember_tags(&record.tags);
        next.images.push(record.clone());
        self.commit(&mut guard, next)?;

        tracing::info!(
            "Stored image {} ({}) with {} tags",
            record.id,
            record.original_name,
            record.tags.len()
        );
        Ok(record)
    }

    /// Overwrite a record's tags and persist.
    pub fn replace_image_tags(
        &self,
        id: &str,
        tags: Vec<String>,
    ) -> Result<ImageRecord, StorageError> {
        let mut guard = self.lock_document("replace_image_tags");
        let idx = guard
            .position(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let mut next = guard.clone();
        next.remember_tags(&tags);
        next.images[idx].tags = tags;
        let updated = next.images[idx].clone();
        self.commit(&mut guard, next)?;

        tracing::debug!("Replaced tags of image {}: {:?}", id, updated.tags);
        Ok(updated)
    }

    /// Remove a record, unlink its file and persist.
    ///
    /// A missing or undeletable file is logged and otherwise ignored.
    pub fn remove_image(&self, id: &str) -> Result<ImageRecord, StorageError> {
        let mut guard = self.lock_document("remove_image");
        let idx = guard
            .position(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let mut next = guard.clone();
        let removed = next.images.remove(idx);
        self.commit(&mut guard, next)?;

        // Only unlink once the record is gone for good.
        let file_path = self.uploads_dir.join(&removed.filename);
        if let Err(e) = std::fs::remove_file(&file_path) {
            tracing::warn!("Failed to delete {}: {}", file_path.display(), e);
        }

        tracing::info!("Deleted image {} ({})", removed.id, removed.original_name);
        Ok(removed)
    }

    /// Persist `next` and only then make it the in-memory state.
    fn commit(
        &self,
        current: &mut LibraryDocument,
        next: LibraryDocument,
    ) -> Result<(), StorageError> {
        document::save(&self.document_path, &next)?;
        *current = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ImageStore;
    use std::path::Path;

    fn record(id: &str, filename: &str, tags: &[&str]) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            filename: filename.to_string(),
            original_name: format!("orig-{}", filename),
            url: format!("/uploads/{}", filename),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: "2024-05-01T10:00:00.000Z".to_string(),
        }
    }

    fn open(root: &Path) -> StorageState {
        StorageState::load(&root.join("data"), &root.join("uploads")).unwrap()
    }

    fn persisted(root: &Path) -> LibraryDocument {
        let content = std::fs::read_to_string(root.join("data").join("db.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn append_persists_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());

        store.append(record("a1", "1-a.png", &["sky", "Blue"])).unwrap();

        let doc = persisted(dir.path());
        assert_eq!(doc.images.len(), 1);
        assert_eq!(doc.images[0].id, "a1");
        assert_eq!(doc.tags, vec!["sky", "Blue"]);

        let reopened = open(dir.path());
        assert_eq!(reopened.get("a1").unwrap().tags, vec!["sky", "Blue"]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.append(record("a1", "1-a.png", &[])).unwrap();

        let err = store.append(record("a1", "2-b.png", &[])).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateId(id) if id == "a1"));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn replace_tags_on_unknown_id_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.append(record("a1", "1-a.png", &["sky"])).unwrap();
        let before = std::fs::read_to_string(store.document_path()).unwrap();

        let err = store
            .replace_tags("missing", vec!["new".to_string()])
            .unwrap_err();

        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(std::fs::read_to_string(store.document_path()).unwrap(), before);
        assert_eq!(store.tags(), vec!["sky"]);
    }

    #[test]
    fn replace_tags_overwrites_and_grows_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.append(record("a1", "1-a.png", &["sky", "sea"])).unwrap();

        let updated = store
            .replace_tags("a1", vec!["cat".to_string(), "cat".to_string()])
            .unwrap();

        assert_eq!(updated.tags, vec!["cat", "cat"]);
        assert_eq!(store.tags(), vec!["sky", "sea", "cat"]);
        assert_eq!(persisted(dir.path()).images[0].tags, vec!["cat", "cat"]);
    }

    #[test]
    fn remove_unlinks_file_and_keeps_tag_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let file = dir.path().join("uploads").join("1-a.png");
        std::fs::write(&file, b"png").unwrap();
        store.append(record("a1", "1-a.png", &["sky"])).unwrap();

        let removed = store.remove("a1").unwrap();

        assert_eq!(removed.id, "a1");
        assert!(!file.exists());
        assert!(store.get("a1").is_none());
        assert_eq!(store.tags(), vec!["sky"]);
        assert!(persisted(dir.path()).images.is_empty());
    }

    #[test]
    fn failed_remove_keeps_record_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let file = dir.path().join("uploads").join("1-a.png");
        std::fs::write(&file, b"png").unwrap();
        store.append(record("a1", "1-a.png", &["sky"])).unwrap();

        // A directory in the way makes the document write fail.
        std::fs::create_dir(dir.path().join("data").join("db.json.tmp")).unwrap();

        assert!(store.remove("a1").is_err());
        assert!(store.get("a1").is_some());
        assert!(file.exists());
        assert_eq!(persisted(dir.path()).images.len(), 1);
    }

    #[test]
    fn remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.append(record("a1", "never-written.png", &[])).unwrap();

        assert!(store.remove("a1").is_ok());
        assert!(matches!(store.remove("a1"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn all_keeps_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        for id in ["c", "a", "b"] {
            store.append(record(id, &format!("{}.png", id), &[])).unwrap();
        }

        let ids: Vec<String> = store.all().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
