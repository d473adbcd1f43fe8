//! Server settings

use std::path::PathBuf;

/// Default upload limit: 10 000 KiB
pub const DEFAULT_MAX_UPLOAD_KB: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// sqlx connection string; `None` uses a file in the platform data dir
    pub database_url: Option<String>,
    /// Root for uploaded originals and signed artifacts
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn new(database_url: Option<String>, storage_dir: PathBuf, max_upload_kb: usize) -> Self {
        Self {
            database_url,
            storage_dir,
            max_upload_bytes: max_upload_kb.saturating_mul(1024),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(None, PathBuf::from("storage"), DEFAULT_MAX_UPLOAD_KB)
    }
}
