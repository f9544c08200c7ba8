// Daemon configuration from CRYPTQ_* environment variables

use anyhow::{bail, Context, Result};
use cryptq_core::application::worker::constants::DEFAULT_WORKERS_PER_QUEUE;
use cryptq_infra_crypto::{EngineConfig, HybridCipher};
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "~/.cryptq/cryptq.db";
const DEFAULT_KEYRING_DIR: &str = "~/.cryptq/keys";
const DEFAULT_OWNERS_FILE: &str = "~/.cryptq/owners.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub keyring_dir: PathBuf,
    pub owners_file: PathBuf,
    pub workers_per_queue: usize,
    pub log_format: LogFormat,
    pub engine: EngineConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |name: &str, default: &str| -> String {
            let raw = lookup(name).unwrap_or_else(|| default.to_string());
            shellexpand::tilde(&raw).into_owned()
        };

        let mut engine = EngineConfig::default();
        if let Some(v) = lookup("CRYPTQ_BUFFER_SIZE") {
            engine.buffer_size = v.parse().context("CRYPTQ_BUFFER_SIZE")?;
        }
        if let Some(v) = lookup("CRYPTQ_ZSTD_LEVEL") {
            engine.zstd_level = v.parse().context("CRYPTQ_ZSTD_LEVEL")?;
        }
        if let Some(v) = lookup("CRYPTQ_GZIP_LEVEL") {
            engine.gzip_level = v.parse().context("CRYPTQ_GZIP_LEVEL")?;
        }
        if let Some(v) = lookup("CRYPTQ_CHUNK_SIZE") {
            engine.chunk_size = v.parse().context("CRYPTQ_CHUNK_SIZE")?;
        }
        if let Some(v) = lookup("CRYPTQ_HYBRID_CIPHER") {
            engine.hybrid_cipher = v.parse::<HybridCipher>()?;
        }

        let workers_per_queue = match lookup("CRYPTQ_WORKERS_PER_QUEUE") {
            Some(v) => v.parse().context("CRYPTQ_WORKERS_PER_QUEUE")?,
            None => DEFAULT_WORKERS_PER_QUEUE,
        };
        if workers_per_queue == 0 {
            bail!("CRYPTQ_WORKERS_PER_QUEUE must be at least 1");
        }

        let log_format = match lookup("CRYPTQ_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            db_path: path("CRYPTQ_DB_PATH", DEFAULT_DB_PATH),
            keyring_dir: PathBuf::from(path("CRYPTQ_KEYRING_DIR", DEFAULT_KEYRING_DIR)),
            owners_file: PathBuf::from(path("CRYPTQ_OWNERS_FILE", DEFAULT_OWNERS_FILE)),
            workers_per_queue,
            log_format,
            engine,
        })
    }
}
