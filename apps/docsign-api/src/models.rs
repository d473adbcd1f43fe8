//! Data models for DocSign API

use chrono::{DateTime, Utc};
use docsign_core::{
    placement::{DEFAULT_DISPLAY_WIDTH, DEFAULT_SCREEN_BOX},
    screen_to_native, Document, DocumentStatus, LifecycleError, PageMetrics, Placement,
    PlacementError, ScreenBox,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Document row as stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct DbDocument {
    pub id: i64,
    pub title: String,
    pub original_path: String,
    pub provider_document_id: Option<String>,
    pub status: String,
    pub signed_path: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbDocument> for Document {
    type Error = LifecycleError;

    fn try_from(row: DbDocument) -> Result<Self, Self::Error> {
        let document = Document {
            id: row.id,
            title: row.title,
            original_path: row.original_path,
            provider_document_id: row.provider_document_id,
            status: row.status.parse::<DocumentStatus>()?,
            signed_path: row.signed_path,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        document.validate()?;
        Ok(document)
    }
}

/// Document list for the index view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
    pub count: usize,
}

/// Everything the placement screen needs to render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareResponse {
    pub document: Document,
    /// Where the browser loads the original PDF from
    pub pdf_url: String,
    pub display_width: f64,
    pub default_box: ScreenBox,
    pub min_field_size: u32,
}

impl PrepareResponse {
    pub fn new(document: Document) -> Self {
        Self {
            pdf_url: format!("/documents/{}/original", document.id),
            document,
            display_width: DEFAULT_DISPLAY_WIDTH,
            default_box: DEFAULT_SCREEN_BOX,
            min_field_size: docsign_core::MIN_FIELD_SIZE,
        }
    }
}

fn default_display_width() -> f64 {
    DEFAULT_DISPLAY_WIDTH
}

/// Request to start signing a document.
///
/// Clients either send the field already in native page units, or the box
/// as dragged on screen together with the page size it was rendered from.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignRequest {
    Native {
        page_number: f64,
        signature_x_orig: f64,
        signature_y_orig: f64,
        signature_w_orig: f64,
        signature_h_orig: f64,
    },
    OnScreen {
        page_number: f64,
        screen: ScreenBox,
        #[serde(default = "default_display_width")]
        display_width: f64,
        /// Native page size; absent until the viewer has measured the page
        #[serde(default)]
        page_size: Option<PageMetrics>,
    },
}

impl SignRequest {
    /// Run the validation gate (and the coordinate transform for on-screen
    /// boxes). Nothing leaves the process before this succeeds.
    pub fn into_placement(self) -> Result<Placement, PlacementError> {
        match self {
            SignRequest::Native {
                page_number,
                signature_x_orig,
                signature_y_orig,
                signature_w_orig,
                signature_h_orig,
            } => Placement::from_raw(
                page_number,
                signature_x_orig,
                signature_y_orig,
                signature_w_orig,
                signature_h_orig,
            ),
            SignRequest::OnScreen {
                page_number,
                screen,
                display_width,
                page_size,
            } => {
                let native = screen_to_native(0, screen, display_width, page_size)?;
                Placement::from_raw(
                    page_number,
                    native.x as f64,
                    native.y as f64,
                    native.width as f64,
                    native.height as f64,
                )
            }
        }
    }
}

/// Response from sign initiation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    pub document: Document,
    pub signing_url: String,
    /// Set when this request uploaded the document; `false` means the
    /// provider accepted the file but not the signature field
    pub field_placed: Option<bool>,
    pub placement: Placement,
}

/// Result of a check request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Signed,
    Pending,
    Unverified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub outcome: CheckStatus,
    pub message: String,
    pub document: Document,
}
