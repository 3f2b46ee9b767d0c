//! HTTP API and static file serving.

mod analyze;
mod images;
mod static_files;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::analysis::AnalysisAdapter;
use crate::error::ApiError;
use crate::storage::ImageStore;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ImageStore>,
    pub analysis: Arc<AnalysisAdapter>,
    /// Where analysis uploads are spooled while they are being described.
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub public_dir: PathBuf,
    pub dev_mode: bool,
    pub max_upload_bytes: usize,
}

/// Run store and file work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!("Blocking task failed: {}", e);
        ApiError::Internal("background task failed".to_string())
    })
}

pub fn router(state: AppState, options: &ServerOptions) -> Router {
    let uploads = ServeDir::new(state.store.uploads_dir());

    Router::new()
        .route("/api/version", get(images::version))
        .route("/api/tags", get(images::list_tags))
        .route(
            "/api/images",
            get(images::list_images).post(images::upload_image),
        )
        .route(
            "/api/images/{id}",
            get(images::get_image).delete(images::delete_image),
        )
        .route("/api/images/{id}/tags", put(images::replace_tags))
        .route("/api/advanced-analyze", post(analyze::advanced_analyze))
        .with_state(state)
        .nest_service("/uploads", uploads)
        .fallback_service(static_files::frontend(&options.public_dir, options.dev_mode))
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(state: AppState, options: ServerOptions, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state, &options);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!(
        "Listening on http://{} (public dir {}, dev mode {})",
        bind_addr,
        options.public_dir.display(),
        options.dev_mode
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
