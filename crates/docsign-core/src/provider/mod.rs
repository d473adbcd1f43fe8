//! E-signature provider seam
//!
//! The workflow only ever talks to the provider through [`SigningProvider`].
//! [`SignNowClient`] is the HTTP implementation.

mod client;
mod config;
mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::placement::Placement;

pub use client::SignNowClient;
pub use config::{ConfigError, ProviderConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::ProviderError;

/// Role every injected signature field is assigned to
pub const SIGNER_ROLE: &str = "Signer 1";

/// Bearer token returned by the provider's token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Result of uploading a document and injecting its signature field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub provider_document_id: String,
    /// `false` when the upload succeeded but the field could not be placed
    pub field_placed: bool,
}

/// Provider-side signing status of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// At least one signature has been captured
    Signed,
    /// The provider answered and reports no signatures
    NotSigned,
    /// The provider could not be asked; treated as not signed
    Unknown(String),
}

impl SignatureStatus {
    pub fn is_signed(&self) -> bool {
        matches!(self, SignatureStatus::Signed)
    }
}

#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Exchange the configured service credentials for an access token
    async fn authenticate(&self) -> Result<AccessToken, ProviderError>;

    /// Upload `pdf` and inject one required signature field at `placement`.
    ///
    /// A failed field injection is logged and reported through
    /// [`UploadOutcome::field_placed`]; only a failed upload is an error.
    async fn upload_and_place_field(
        &self,
        token: &AccessToken,
        file_name: &str,
        pdf: Vec<u8>,
        placement: &Placement,
    ) -> Result<UploadOutcome, ProviderError>;

    /// Signing URL that does not require the signer to register
    async fn create_signing_link(
        &self,
        token: &AccessToken,
        provider_document_id: &str,
    ) -> Result<String, ProviderError>;

    /// Never fails; an unreachable provider yields [`SignatureStatus::Unknown`]
    async fn check_signed_status(
        &self,
        token: &AccessToken,
        provider_document_id: &str,
    ) -> SignatureStatus;

    /// The flattened PDF with signatures merged into the page content
    async fn download_signed(
        &self,
        token: &AccessToken,
        provider_document_id: &str,
    ) -> Result<Vec<u8>, ProviderError>;
}
