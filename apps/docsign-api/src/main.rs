//! DocSign API Server - document signing through an e-signature provider
//!
//! Provides REST endpoints for:
//! - PDF upload and listing
//! - Signature placement and signing links
//! - Status checks and signed artifact download

use anyhow::{Context, Result};
use clap::Parser;
use docsign_api::{router, AppState, ServerConfig};
use docsign_core::{ProviderConfig, SignNowClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for the DocSign API server
#[derive(Parser, Debug)]
#[command(name = "docsign-api")]
#[command(about = "Document signing backend delegating to an e-signature provider")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// sqlx database URL (defaults to a SQLite file in the data directory)
    #[arg(long)]
    database_url: Option<String>,

    /// Directory for uploaded and signed PDFs
    #[arg(long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Maximum upload size in KiB
    #[arg(long, default_value = "10000")]
    max_upload_kb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
            .add_directive("docsign_api=info".parse()?)
            .add_directive("docsign_core=info".parse()?)
            .add_directive("tower_http=debug".parse()?)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Initializing DocSign API...");

    let provider_config = ProviderConfig::from_env().context("Invalid provider configuration")?;
    info!("Signing provider: {}", provider_config.base_url);
    let provider = SignNowClient::new(provider_config)?;

    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok());
    let config = ServerConfig::new(database_url, args.storage_dir, args.max_upload_kb);

    let state = Arc::new(AppState::new(&config, Arc::new(provider)).await?);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting DocSign API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
