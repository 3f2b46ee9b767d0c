//! Data type definitions for the storage module.

use serde::{Deserialize, Serialize};

/// Metadata of one stored image, exactly as persisted in the library document
/// and returned to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    /// Generated storage name inside the uploads directory.
    pub filename: String,
    /// Name the client uploaded the file under.
    pub original_name: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
}

/// The whole persisted state: every image record plus the tag index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDocument {
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    /// Every distinct tag ever assigned. Grows only.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LibraryDocument {
    /// Merge tags into the index, keeping first-seen order and skipping
    /// exact duplicates.
    pub fn remember_tags<'a, I>(&mut self, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
    }

    pub(super) fn position(&self, id: &str) -> Option<usize> {
        self.images.iter().position(|image| image.id == id)
    }
}
