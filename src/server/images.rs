use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use super::{blocking, AppState};
use crate::error::ApiError;
use crate::storage::{ImageRecord, SearchQuery};
use crate::upload::{self, TagsInput, UploadRequest};

/// The `q`, `tags` and `mode` search parameters. A parameter given more
/// than once is treated as absent.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct ListParams {
    q: Option<String>,
    tags: Option<String>,
    mode: Option<String>,
}

impl ListParams {
    pub(super) fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let single = |key: &str| {
            let mut values = pairs.iter().filter(|(k, _)| k == key).map(|(_, v)| v);
            match (values.next(), values.next()) {
                (Some(v), None) => Some(v.clone()),
                _ => None,
            }
        };
        Self {
            q: single("q"),
            tags: single("tags"),
            mode: single("mode"),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ImageList {
    count: usize,
    images: Vec<ImageRecord>,
}

#[derive(Debug, Serialize)]
pub(super) struct TagList {
    count: usize,
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct VersionInfo {
    version: &'static str,
    name: &'static str,
    description: &'static str,
}

pub(super) async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        name: env!("CARGO_PKG_NAME"),
        description: env!("CARGO_PKG_DESCRIPTION"),
    })
}

pub(super) async fn list_tags(State(state): State<AppState>) -> Json<TagList> {
    let tags = state.store.tags();
    Json(TagList {
        count: tags.len(),
        tags,
    })
}

pub(super) async fn list_images(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ImageList>, ApiError> {
    let Query(pairs) = query?;
    let params = ListParams::from_pairs(pairs);
    let query = SearchQuery::from_params(
        params.q.as_deref(),
        params.tags.as_deref(),
        params.mode.as_deref(),
    );
    tracing::debug!(
        "Search keyword {:?}, tags {:?}, mode {:?}",
        query.keyword(),
        query.tags(),
        query.mode()
    );

    let images = state.store.search(&query);
    Ok(Json(ImageList {
        count: images.len(),
        images,
    }))
}

pub(super) async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageRecord>, ApiError> {
    state.store.get(&id).map(Json).ok_or(ApiError::NotFound)
}

pub(super) async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageRecord>), ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut tag_fields: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let Some(original_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let data = field.bytes().await?;
                file = Some((original_name, data.to_vec()));
            }
            Some("tags") => tag_fields.push(field.text().await?),
            _ => {}
        }
    }

    let (original_name, data) =
        file.ok_or_else(|| ApiError::BadRequest("image field is required".to_string()))?;
    let request = UploadRequest {
        original_name,
        data,
        tags: TagsInput::from_fields(tag_fields),
    };

    let store = state.store.clone();
    let record = blocking(move || upload::store_upload(store.as_ref(), request))
        .await
        .map_err(|_| ApiError::UploadFailed)?
        .map_err(|e| {
            tracing::error!("Upload failed: {}", e);
            ApiError::UploadFailed
        })?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// The `tags` array of a tag replacement body. Anything that is not an
/// array counts as empty; non-string items are dropped.
pub(super) fn tags_from_body(body: &[u8]) -> Vec<String> {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    match value.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub(super) async fn replace_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ImageRecord>, ApiError> {
    let tags = tags_from_body(&body);
    let store = state.store.clone();
    let record = blocking(move || store.replace_tags(&id, tags)).await??;
    Ok(Json(record))
}

pub(super) async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store.clone();
    blocking(move || store.remove(&id)).await??;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_body_keeps_strings_only() {
        assert_eq!(
            tags_from_body(br#"{"tags": ["x", 1, null, "y", {"a": 1}]}"#),
            vec!["x", "y"]
        );
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn list_params_pick_single_values() {
        let params = ListParams::from_pairs(pairs(&[("q", "sun"), ("tags", "a,b"), ("x", "1")]));
        assert_eq!(params.q.as_deref(), Some("sun"));
        assert_eq!(params.tags.as_deref(), Some("a,b"));
        assert_eq!(params.mode, None);
    }

    #[test]
    fn repeated_list_param_is_ignored() {
        let params = ListParams::from_pairs(pairs(&[("tags", "cat"), ("tags", "dog"), ("mode", "and")]));
        assert_eq!(params.tags, None);
        assert_eq!(params.mode.as_deref(), Some("and"));
    }

    #[test]
    fn tag_body_that_is_not_an_array_is_empty() {
        assert!(tags_from_body(br#"{"tags": "x,y"}"#).is_empty());
        assert!(tags_from_body(br#"{}"#).is_empty());
        assert!(tags_from_body(b"").is_empty());
        assert!(tags_from_body(b"not json").is_empty());
    }
}
