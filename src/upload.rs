//! Upload handling: tag field normalisation, identity generation and the
//! file + record write for a freshly uploaded image.

use std::path::Path;

use rand::Rng;

use crate::storage::{ImageRecord, ImageStore, StorageError};

/// URL-safe alphabet used for record ids and filename suffixes.
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
const ID_LEN: usize = 12;
const FILENAME_SUFFIX_LEN: usize = 8;

/// The `tags` form field as it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagsInput {
    #[default]
    Missing,
    /// A single comma separated value.
    Csv(String),
    /// Several values, already split by the client.
    List(Vec<String>),
}

impl TagsInput {
    /// Fold every received `tags` field value into one input.
    pub fn from_fields(values: Vec<String>) -> Self {
        let mut values = values;
        match values.len() {
            0 => TagsInput::Missing,
            1 => TagsInput::Csv(values.remove(0)),
            _ => TagsInput::List(values),
        }
    }

    /// A list is kept as given; a CSV string is split on commas, trimmed and
    /// stripped of empty segments. Duplicates survive.
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::Missing => Vec::new(),
            TagsInput::Csv(s) => split_csv(&s),
            TagsInput::List(list) => list,
        }
    }
}

/// Split a comma separated list, trimming each entry and dropping empties.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A file received from the client, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub original_name: String,
    pub data: Vec<u8>,
    pub tags: TagsInput,
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

pub fn generate_image_id() -> String {
    random_token(ID_LEN)
}

/// Final path component of a client supplied name; clients may send full paths.
pub fn sanitize_original_name(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("upload")
        .to_string()
}

/// `<unix-millis>-<random suffix><.ext>`, keeping the original extension.
pub fn storage_filename(original_name: &str, now_ms: i64) -> String {
    let ext = Path::new(original_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}-{}{}", now_ms, random_token(FILENAME_SUFFIX_LEN), ext)
}

/// Write the uploaded bytes and append the new record.
///
/// If the record cannot be persisted the written file is removed again.
pub fn store_upload(
    store: &dyn ImageStore,
    request: UploadRequest,
) -> Result<ImageRecord, StorageError> {
    let now = chrono::Utc::now();
    let original_name = sanitize_original_name(&request.original_name);
    let filename = storage_filename(&original_name, now.timestamp_millis());

    if image::guess_format(&request.data).is_err() {
        tracing::warn!(
            "Upload {} is not a recognised image format, storing anyway",
            original_name
        );
    }

    let file_path = store.uploads_dir().join(&filename);
    std::fs::write(&file_path, &request.data).map_err(|source| StorageError::Io {
        context: format!("failed to write {}", file_path.display()),
        source,
    })?;

    let record = ImageRecord {
        id: generate_image_id(),
        url: format!("/uploads/{}", filename),
        filename,
        original_name,
        tags: request.tags.into_tags(),
        created_at: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    };

    store.append(record).inspect_err(|_| {
        if let Err(e) = std::fs::remove_file(&file_path) {
            tracing::warn!("Failed to clean up {}: {}", file_path.display(), e);
        }
    })
}
