//! Storage module - JSON document backed image library
//!
//! This module provides:
//! 1. The image record collection and the tag index, persisted as one JSON document
//! 2. Uploaded file management (the uploads directory)
//! 3. Keyword and tag search over the collection

mod document;
mod images;
pub mod search;
mod types;

pub use search::{SearchQuery, TagMatchMode};
pub use types::*;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File name of the library document inside the data directory.
pub const DOCUMENT_FILE_NAME: &str = "db.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialise library document: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("library document {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("image {0} not found")]
    NotFound(String),
    #[error("image id {0} already exists")]
    DuplicateId(String),
}

/// The operations the HTTP layer needs from an image library.
///
/// Every mutating call persists before it returns.
pub trait ImageStore: Send + Sync {
    /// All records in insertion order.
    fn all(&self) -> Vec<ImageRecord>;

    fn get(&self, id: &str) -> Option<ImageRecord>;

    /// The tag index.
    fn tags(&self) -> Vec<String>;

    fn append(&self, record: ImageRecord) -> Result<ImageRecord, StorageError>;

    fn replace_tags(&self, id: &str, tags: Vec<String>) -> Result<ImageRecord, StorageError>;

    /// Remove a record and, best-effort, its backing file.
    fn remove(&self, id: &str) -> Result<ImageRecord, StorageError>;

    /// Directory the backing files live in.
    fn uploads_dir(&self) -> &Path;

    fn search(&self, query: &SearchQuery) -> Vec<ImageRecord> {
        search::filter_images(&self.all(), query)
    }
}

/// StorageState owns the in-memory library document and the paths it is
/// persisted to. It is loaded once at startup and shared by all requests.
pub struct StorageState {
    doc: Mutex<LibraryDocument>,
    /// Path of the JSON document
    document_path: PathBuf,
    /// Directory holding uploaded originals
    uploads_dir: PathBuf,
    /// Diagnostic: which operation currently holds the document lock
    lock_holder: Mutex<&'static str>,
}

impl StorageState {
    /// Load the library from `data_dir`, creating the directories and an
    /// empty document on first start.
    pub fn load(data_dir: &Path, uploads_dir: &Path) -> Result<Self, StorageError> {
        for dir in [data_dir, uploads_dir] {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                context: format!("failed to create {}", dir.display()),
                source,
            })?;
        }

        let document_path = data_dir.join(DOCUMENT_FILE_NAME);
        let doc = document::load_or_init(&document_path)?;
        tracing::info!(
            "Loaded library: {} images, {} tags from {}",
            doc.images.len(),
            doc.tags.len(),
            document_path.display()
        );

        Ok(Self {
            doc: Mutex::new(doc),
            document_path,
            uploads_dir: uploads_dir.to_path_buf(),
            lock_holder: Mutex::new(""),
        })
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Acquire the document with caller identification for diagnostic logging.
    fn lock_document(&self, caller: &'static str) -> MutexGuard<'_, LibraryDocument> {
        let wait_start = std::time::Instant::now();
        let current_holder = self.lock_holder.lock().map(|g| *g).unwrap_or("?");
        let guard = self.doc.lock().unwrap_or_else(|e| e.into_inner());
        let wait_dur = wait_start.elapsed();
        if let Ok(mut h) = self.lock_holder.lock() {
            *h = caller;
        }
        if wait_dur.as_secs() >= 5 {
            tracing::warn!(
                "[DIAG:DOC] Lock wait took {:?} for '{}' (was held by '{}')",
                wait_dur,
                caller,
                current_holder
            );
        }
        guard
    }
}

impl ImageStore for StorageState {
    fn all(&self) -> Vec<ImageRecord> {
        self.lock_document("all").images.clone()
    }

    fn get(&self, id: &str) -> Option<ImageRecord> {
        self.get_image(id)
    }

    fn tags(&self) -> Vec<String> {
        self.lock_document("tags").tags.clone()
    }

    fn append(&self, record: ImageRecord) -> Result<ImageRecord, StorageError> {
        self.append_image(record)
    }

    fn replace_tags(&self, id: &str, tags: Vec<String>) -> Result<ImageRecord, StorageError> {
        self.replace_image_tags(id, tags)
    }

    fn remove(&self, id: &str) -> Result<ImageRecord, StorageError> {
        self.remove_image(id)
    }

    fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }
}
