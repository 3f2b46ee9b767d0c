use std::io::Write;
use std::path::Path;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::{blocking, AppState};
use crate::analysis::{AnalysisReport, AnalysisSource, ImageInput};
use crate::error::ApiError;
use crate::upload::split_csv;

const OCR_LOG_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Serialize)]
pub(super) struct AnalyzeResponse {
    analysis: AnalysisReport,
    source: AnalysisSource,
}

/// An analysis upload written to the scratch directory. The file is
/// removed when this value is dropped.
struct SpooledImage {
    file: NamedTempFile,
    original_name: String,
    content_type: Option<String>,
}

async fn spool_field(scratch_dir: &Path, mut field: Field<'_>) -> Result<SpooledImage, ApiError> {
    let original_name = field.file_name().unwrap_or("unknown.jpg").to_string();
    let content_type = field.content_type().map(str::to_string);

    let mut file = match tempfile::Builder::new()
        .prefix("analyze-")
        .tempfile_in(scratch_dir)
    {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!("Cannot spool analysis upload to {}: {}", scratch_dir.display(), e);
            None
        }
    };

    while let Some(chunk) = field.chunk().await? {
        if let Some(f) = file.as_mut() {
            if let Err(e) = f.write_all(&chunk) {
                tracing::warn!("Failed to spool analysis upload: {}", e);
                file = None;
            }
        }
    }

    file.map(|file| SpooledImage {
        file,
        original_name,
        content_type,
    })
    .ok_or_else(|| ApiError::Internal("analysis upload could not be spooled".to_string()))
}

pub(super) async fn advanced_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut image: Option<Result<SpooledImage, ApiError>> = None;
    let mut basic_tags: Vec<String> = Vec::new();
    let mut ocr_text = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") if field.file_name().is_some() => {
                image = Some(spool_field(&state.scratch_dir, field).await);
            }
            Some("basicTags") => basic_tags = split_csv(&field.text().await?),
            Some("ocrText") => ocr_text = field.text().await?.trim().to_string(),
            _ => {}
        }
    }

    let spooled = match image {
        None => return Err(ApiError::BadRequest("Image file is required".to_string())),
        // A broken request body is still the client's problem.
        Some(Err(e @ ApiError::Rejected { .. })) => return Err(e),
        Some(other) => other,
    };

    tracing::debug!("Basic tags received: {:?}", basic_tags);
    if !ocr_text.is_empty() {
        let preview: String = ocr_text.chars().take(OCR_LOG_PREVIEW_CHARS).collect();
        tracing::debug!("OCR text received: {}", preview);
    }

    let input = match spooled {
        Ok(spooled) => blocking(move || {
            ImageInput::read_from(
                spooled.file.path(),
                &spooled.original_name,
                spooled.content_type.as_deref(),
            )
        })
        .await?
        .inspect_err(|e| tracing::warn!("Cannot read spooled analysis upload: {}", e))
        .ok(),
        Err(_) => None,
    };

    let report = match input {
        Some(input) => state.analysis.analyze(&input, &basic_tags).await,
        None => AnalysisReport::unreadable_image(&basic_tags),
    };

    tracing::info!("Analysis finished with source {:?}", report.source);
    Ok(Json(AnalyzeResponse {
        source: report.source,
        analysis: report,
    }))
}
