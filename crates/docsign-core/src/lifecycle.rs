//! Document lifecycle
//!
//! ```text
//! pending ──sign──▶ signing_prepared ──check (signed)──▶ signed
//! ```
//!
//! The provider document id is assigned on the first transition and the
//! signed artifact path on the second. Neither is ever reassigned, and there
//! is no way out of `signed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    SigningPrepared,
    Signed,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 3] = [
        DocumentStatus::Pending,
        DocumentStatus::SigningPrepared,
        DocumentStatus::Signed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::SigningPrepared => "signing_prepared",
            DocumentStatus::Signed => "signed",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "signing_prepared" => Ok(DocumentStatus::SigningPrepared),
            "signed" => Ok(DocumentStatus::Signed),
            other => Err(LifecycleError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Cannot {action} a document in state {from}")]
    InvalidTransition {
        from: DocumentStatus,
        action: &'static str,
    },

    #[error("Document {0} has no signed artifact yet")]
    NotSigned(i64),

    #[error("Unknown document status: {0}")]
    UnknownStatus(String),

    #[error("Document {id} is inconsistent: {reason}")]
    Corrupted { id: i64, reason: &'static str },
}

/// A document tracked through the signing workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub original_path: String,
    pub provider_document_id: Option<String>,
    pub status: DocumentStatus,
    pub signed_path: Option<String>,
    /// Bumped on every committed change; used for optimistic locking
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a sign-initiation request has to do for a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignPlan<'a> {
    /// Not on the provider yet: upload, place the field, then link
    UploadThenLink,
    /// Already uploaded: only a fresh signing link is needed
    LinkOnly { provider_document_id: &'a str },
}

impl Document {
    /// Decide how a sign request proceeds. Signed documents are final.
    pub fn plan_signing(&self) -> Result<SignPlan<'_>, LifecycleError> {
        match (self.status, self.provider_document_id.as_deref()) {
            (DocumentStatus::Signed, _) => Err(LifecycleError::InvalidTransition {
                from: self.status,
                action: "sign",
            }),
            (_, Some(provider_document_id)) => Ok(SignPlan::LinkOnly {
                provider_document_id,
            }),
            (DocumentStatus::Pending, None) => Ok(SignPlan::UploadThenLink),
            (DocumentStatus::SigningPrepared, None) => Err(LifecycleError::Corrupted {
                id: self.id,
                reason: "signing_prepared without a provider document id",
            }),
        }
    }

    /// `pending → signing_prepared`
    pub fn mark_prepared(&mut self, provider_document_id: String) -> Result<(), LifecycleError> {
        if self.status != DocumentStatus::Pending || self.provider_document_id.is_some() {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                action: "prepare",
            });
        }
        self.provider_document_id = Some(provider_document_id);
        self.status = DocumentStatus::SigningPrepared;
        Ok(())
    }

    /// Provider id to poll for a check request.
    ///
    /// `Ok(None)` means the document is already signed and there is nothing
    /// to check.
    pub fn check_target(&self) -> Result<Option<&str>, LifecycleError> {
        match self.status {
            DocumentStatus::Pending => Err(LifecycleError::InvalidTransition {
                from: self.status,
                action: "check",
            }),
            DocumentStatus::SigningPrepared => self
                .provider_document_id
                .as_deref()
                .map(Some)
                .ok_or(LifecycleError::Corrupted {
                    id: self.id,
                    reason: "signing_prepared without a provider document id",
                }),
            DocumentStatus::Signed => Ok(None),
        }
    }

    /// `signing_prepared → signed`
    pub fn mark_signed(&mut self, signed_path: String) -> Result<(), LifecycleError> {
        if self.status != DocumentStatus::SigningPrepared || self.signed_path.is_some() {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                action: "finalize",
            });
        }
        self.signed_path = Some(signed_path);
        self.status = DocumentStatus::Signed;
        Ok(())
    }

    /// Local path of the signed artifact; only signed documents have one.
    pub fn signed_artifact(&self) -> Result<&str, LifecycleError> {
        match (self.status, self.signed_path.as_deref()) {
            (DocumentStatus::Signed, Some(path)) => Ok(path),
            _ => Err(LifecycleError::NotSigned(self.id)),
        }
    }

    /// Check the field/state invariants on a record read back from storage
    pub fn validate(&self) -> Result<(), LifecycleError> {
        let has_provider_id = self.provider_document_id.is_some();
        let has_signed_path = self.signed_path.is_some();
        let corrupted = |reason| LifecycleError::Corrupted {
            id: self.id,
            reason,
        };

        match self.status {
            DocumentStatus::Pending if has_provider_id => {
                Err(corrupted("pending with a provider document id"))
            }
            DocumentStatus::SigningPrepared | DocumentStatus::Signed if !has_provider_id => {
                Err(corrupted("missing provider document id"))
            }
            DocumentStatus::Signed if !has_signed_path => Err(corrupted("signed without a path")),
            DocumentStatus::Pending | DocumentStatus::SigningPrepared if has_signed_path => {
                Err(corrupted("signed path before signing"))
            }
            _ => Ok(()),
        }
    }
}

/// Build the stored name for a signed artifact.
///
/// A millisecond timestamp, the document id and a caller-supplied `nonce`
/// prefix the sanitized title. The nonce must be unique per finalization
/// attempt so two attempts never share a file.
pub fn signed_file_name(id: i64, nonce: &str, title: &str, now: DateTime<Utc>) -> String {
    let title = sanitize_segment(title);
    let title = title.trim_start_matches('.');
    let title = if title.is_empty() { "document.pdf" } else { title };

    format!(
        "signed_{}_{}_{}_{}",
        now.timestamp_millis(),
        id,
        sanitize_segment(nonce),
        title
    )
}

fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
