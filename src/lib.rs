pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod storage;
pub mod upload;

use std::sync::Arc;

use anyhow::Context;

use analysis::AnalysisAdapter;
use config::AppConfig;
use server::{AppState, ServerOptions};
use storage::StorageState;

pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(start(config))
}

async fn start(config: AppConfig) -> anyhow::Result<()> {
    let logs_dir = config.logs_dir();
    let _log_writer = logging::init_logging(&logs_dir);
    logging::spawn_maintenance_task(logs_dir);

    tracing::info!(
        "Starting {} {} with home {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.home_dir.display()
    );

    let store = StorageState::load(&config.data_dir(), &config.uploads_dir())
        .with_context(|| format!("failed to open library in {}", config.data_dir().display()))?;

    let scratch_dir = config.scratch_dir();
    std::fs::create_dir_all(&scratch_dir)
        .with_context(|| format!("failed to create {}", scratch_dir.display()))?;

    let analysis = AnalysisAdapter::from_settings(&config.providers);
    tracing::info!("Analysis providers: {:?}", analysis.provider_names());

    let state = AppState {
        store: Arc::new(store),
        analysis: Arc::new(analysis),
        scratch_dir,
    };
    let options = ServerOptions {
        public_dir: config.public_dir.clone(),
        dev_mode: config.dev_mode,
        max_upload_bytes: config.max_upload_bytes,
    };

    server::serve(state, options, &config.bind_addr()).await
}
