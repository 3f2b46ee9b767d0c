//! Runtime configuration read from environment variables.

use std::path::PathBuf;

use anyhow::{bail, Context};

use crate::analysis::providers::{ProviderSettings, DEFAULT_HF_BASE_URL};

const APP_DIR_NAME: &str = "PicShelf";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_UPLOAD_MB: usize = 25;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root holding `data/`, `uploads/`, `tmp/` and `logs/`.
    pub home_dir: PathBuf,
    pub public_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub providers: ProviderSettings,
    /// Serve the front-end with no-cache headers.
    pub dev_mode: bool,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home_dir = get("PICSHELF_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(default_home_dir);
        let public_dir = get("PICSHELF_PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("public"));
        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {:?}", v))?,
            None => DEFAULT_PORT,
        };

        let token = get("HF_TOKEN").or_else(|| get("HUGGINGFACE_TOKEN"));
        let base_url = get("PICSHELF_HF_BASE_URL").unwrap_or_else(|| DEFAULT_HF_BASE_URL.to_string());
        let remote_enabled = match get("PICSHELF_REMOTE_ANALYSIS") {
            Some(v) => parse_flag(&v).context("PICSHELF_REMOTE_ANALYSIS")?,
            None => true,
        };

        let dev_mode = match get("PICSHELF_DEV") {
            Some(v) => parse_flag(&v).context("PICSHELF_DEV")?,
            None => cfg!(debug_assertions),
        };

        let max_upload_mb = match get("PICSHELF_MAX_UPLOAD_MB") {
            Some(v) => {
                let mb = v
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("PICSHELF_MAX_UPLOAD_MB must be a number, got {:?}", v))?;
                if mb == 0 {
                    bail!("PICSHELF_MAX_UPLOAD_MB must be greater than zero");
                }
                mb
            }
            None => DEFAULT_MAX_UPLOAD_MB,
        };

        Ok(Self {
            home_dir,
            public_dir,
            host,
            port,
            providers: ProviderSettings {
                base_url,
                token,
                remote_enabled,
            },
            dev_mode,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.home_dir.join("data")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.home_dir.join("uploads")
    }

    /// Scratch space for images spooled during analysis.
    pub fn scratch_dir(&self) -> PathBuf {
        self.home_dir.join("tmp")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir.join("logs")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_home_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("expected a boolean, got {:?}", other),
    }
}
