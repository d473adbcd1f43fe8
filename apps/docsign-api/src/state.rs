//! Application state for DocSign API

use anyhow::Result;
use docsign_core::SigningProvider;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::FileStorage;

pub struct AppState {
    pub db: SqlitePool,
    pub storage: FileStorage,
    pub provider: Arc<dyn SigningProvider>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub async fn new(config: &ServerConfig, provider: Arc<dyn SigningProvider>) -> Result<Self> {
        // Get database path from config or use default
        let db_path = config.database_url.clone().unwrap_or_else(|| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("docsign-api");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/docsign.db?mode=rwc", data_dir.display())
        });

        tracing::info!("Connecting to database: {}", db_path);

        // Every connection to an in-memory database is a separate database,
        // so those get exactly one connection that is never recycled.
        let pool = if db_path.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(&db_path)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect(&db_path)
                .await?
        };

        Self::run_migrations(&pool).await?;

        let storage = FileStorage::new(config.storage_dir.clone()).await?;
        tracing::info!("Storing files under {}", storage.root().display());

        Ok(Self {
            db: pool,
            storage,
            provider,
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                original_path TEXT NOT NULL,
                provider_document_id TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                signed_path TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}

/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
