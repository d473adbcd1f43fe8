//! HTTP handlers for DocSign API

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::Redirect,
    Json,
};
use docsign_core::Document;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;
use crate::storage::ORIGINALS_DIR;
use crate::store;
use crate::workflow::{self, CheckOutcome};

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

type FileResponse = (StatusCode, [(header::HeaderName, String); 2], Vec<u8>);

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

pub async fn index() -> Redirect {
    Redirect::to("/documents")
}

/// List documents, newest first
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = store::list(&state.db).await?;
    Ok(Json(DocumentListResponse {
        count: documents.len(),
        documents,
    }))
}

/// Upload a PDF and register it as a pending document
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let limit = state.max_upload_bytes;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        upload = Some((file_name, content_type, bytes));
        break;
    }

    let (file_name, content_type, bytes) = upload.ok_or_else(|| {
        ApiError::InvalidUpload(format!("missing `{}` file field", UPLOAD_FIELD))
    })?;
    validate_pdf_upload(&file_name, content_type.as_deref(), &bytes, limit)?;

    let title = if file_name.trim().is_empty() {
        "document.pdf".to_string()
    } else {
        file_name
    };

    let original_path = format!("{}/{}.pdf", ORIGINALS_DIR, Uuid::new_v4());
    state.storage.write(&original_path, &bytes).await?;

    let document = match store::insert(&state.db, &title, &original_path).await {
        Ok(document) => document,
        Err(e) => {
            if let Err(remove_err) = state.storage.remove(&original_path).await {
                tracing::warn!("Could not remove orphaned {}: {}", original_path, remove_err);
            }
            return Err(e);
        }
    };

    Ok((StatusCode::CREATED, Json(document)))
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(limit)
    } else {
        ApiError::InvalidUpload(err.body_text())
    }
}

/// Accept only PDFs within the size limit.
///
/// The name or declared type must say PDF, and the bytes must start with the
/// PDF header either way.
pub fn validate_pdf_upload(
    file_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(), ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::InvalidUpload("file is empty".into()));
    }
    if bytes.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(max_bytes));
    }

    let named_pdf = file_name.to_ascii_lowercase().ends_with(".pdf");
    let typed_pdf = content_type.is_some_and(|t| t.eq_ignore_ascii_case("application/pdf"));
    if !named_pdf && !typed_pdf {
        return Err(ApiError::InvalidUpload("only PDF files are accepted".into()));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ApiError::InvalidUpload("file is not a PDF".into()));
    }
    Ok(())
}

/// Get document by ID
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(store::fetch(&state.db, id).await?))
}

/// Placement screen model
pub async fn prepare_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PrepareResponse>, ApiError> {
    let document = store::fetch(&state.db, id).await?;
    Ok(Json(PrepareResponse::new(document)))
}

/// Original PDF, for the placement screen's viewer
pub async fn original_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<FileResponse, ApiError> {
    let document = store::fetch(&state.db, id).await?;
    let bytes = state.storage.read(&document.original_path).await?;
    Ok(pdf_response("inline", &document.title, bytes))
}

/// Submit placement and start signing
pub async fn sign_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<SignResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let placement = req.into_placement()?;
    tracing::debug!("Sign request for document {}: {:?}", id, placement);

    let session = workflow::initiate_signing(&state, id, placement).await?;

    Ok(Json(SignResponse {
        document: session.document,
        signing_url: session.signing_url,
        field_placed: session.field_placed,
        placement,
    }))
}

/// Ask the provider whether the document was signed and finalize it if so
pub async fn check_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CheckResponse>, ApiError> {
    let response = match workflow::check_and_finalize(&state, id).await? {
        CheckOutcome::Signed(document) => CheckResponse {
            outcome: CheckStatus::Signed,
            message: "Document signed".to_string(),
            document,
        },
        CheckOutcome::NotYetSigned(document) => CheckResponse {
            outcome: CheckStatus::Pending,
            message: "The document has not been signed yet, try again later".to_string(),
            document,
        },
        CheckOutcome::Unverified { document, reason } => {
            tracing::warn!("Could not verify document {}: {}", id, reason);
            CheckResponse {
                outcome: CheckStatus::Unverified,
                message: "Could not reach the signing service, try again later".to_string(),
                document,
            }
        }
    };
    Ok(Json(response))
}

/// Download the signed artifact
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<FileResponse, ApiError> {
    let (document, bytes) = workflow::signed_artifact(&state, id).await?;
    Ok(pdf_response("attachment", &document.title, bytes))
}

fn pdf_response(disposition: &str, title: &str, bytes: Vec<u8>) -> FileResponse {
    let file_name: String = title
        .chars()
        .map(|c| {
            if c == '"' || c == '\\' || !c.is_ascii() || c.is_ascii_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("{}; filename=\"{}\"", disposition, file_name),
            ),
        ],
        bytes,
    )
}
