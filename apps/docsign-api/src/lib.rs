//! DocSign API - upload a PDF, place a signature field, sign through the
//! e-signature provider and collect the signed artifact.
//!
//! Routes:
//! - `GET  /documents` list, `POST /documents` upload (multipart `pdf`)
//! - `GET  /documents/:id`, `/documents/:id/prepare`, `/documents/:id/original`
//! - `POST /documents/:id/sign` place the field and get a signing link
//! - `POST /documents/:id/check` poll the provider and finalize
//! - `GET  /documents/:id/download` signed artifact

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;
pub mod workflow;


pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/documents",
            get(handlers::list_documents).post(handlers::upload_document),
        )
        .route("/documents/:id", get(handlers::get_document))
        .route("/documents/:id/prepare", get(handlers::prepare_document))
        .route("/documents/:id/original", get(handlers::original_document))
        .route("/documents/:id/sign", post(handlers::sign_document))
        .route("/documents/:id/check", post(handlers::check_document))
        .route("/documents/:id/download", get(handlers::download_document))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
