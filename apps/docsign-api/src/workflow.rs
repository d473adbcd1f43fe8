//! Signing workflow
//!
//! Drives a document through its lifecycle by combining the state guards on
//! [`Document`], the signing provider, local file storage and the store.
//! Every guard runs before the first provider call, and each request ends
//! with at most one versioned commit.

use chrono::Utc;
use docsign_core::{
    signed_file_name, Document, Placement, SignPlan, SignatureStatus, UploadOutcome,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::SIGNED_DIR;
use crate::store;

/// A document ready to be signed at the provider
#[derive(Debug, Clone)]
pub struct SigningSession {
    pub document: Document,
    pub signing_url: String,
    /// `None` when the document had already been uploaded earlier
    pub field_placed: Option<bool>,
}

/// What a check request found out
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// The document is signed and the artifact is stored locally
    Signed(Document),
    /// The provider reports no signatures yet
    NotYetSigned(Document),
    /// The provider could not be asked; nothing changed
    Unverified { document: Document, reason: String },
}

/// `pending → signing_prepared`, or a fresh link for a prepared document.
///
/// The upload only happens while the document has no provider id, so
/// repeated calls never create a second provider document.
pub async fn initiate_signing(
    state: &AppState,
    id: i64,
    placement: Placement,
) -> Result<SigningSession, ApiError> {
    let document = store::fetch(&state.db, id).await?;
    let existing = match document.plan_signing()? {
        SignPlan::LinkOnly {
            provider_document_id,
        } => Some(provider_document_id.to_string()),
        SignPlan::UploadThenLink => None,
    };

    let token = state.provider.authenticate().await?;

    let (document, provider_document_id, field_placed) = match existing {
        Some(provider_document_id) => {
            info!(
                "Document {} already uploaded as {}, skipping upload",
                id, provider_document_id
            );
            (document, provider_document_id, None)
        }
        None => {
            let pdf = state.storage.read(&document.original_path).await?;
            let UploadOutcome {
                provider_document_id,
                field_placed,
            } = state
                .provider
                .upload_and_place_field(&token, &document.title, pdf, &placement)
                .await?;
            if !field_placed {
                warn!(
                    "Document {} uploaded as {} without a signature field",
                    id, provider_document_id
                );
            }

            let mut prepared = document;
            prepared.mark_prepared(provider_document_id.clone())?;
            let prepared = store::commit(&state.db, &prepared).await?;
            info!(
                "Document {} is signing_prepared (provider id {})",
                id, provider_document_id
            );
            (prepared, provider_document_id, Some(field_placed))
        }
    };

    let signing_url = state
        .provider
        .create_signing_link(&token, &provider_document_id)
        .await?;

    Ok(SigningSession {
        document,
        signing_url,
        field_placed,
    })
}

/// `signing_prepared → signed` when the provider has captured a signature.
///
/// Not-yet-signed and unverifiable results leave the record untouched.
pub async fn check_and_finalize(state: &AppState, id: i64) -> Result<CheckOutcome, ApiError> {
    let document = store::fetch(&state.db, id).await?;
    let provider_document_id = match document.check_target()? {
        Some(provider_document_id) => provider_document_id.to_string(),
        None => return Ok(CheckOutcome::Signed(document)),
    };

    let token = state.provider.authenticate().await?;

    match state
        .provider
        .check_signed_status(&token, &provider_document_id)
        .await
    {
        SignatureStatus::NotSigned => {
            info!("Document {} is not signed yet", id);
            Ok(CheckOutcome::NotYetSigned(document))
        }
        SignatureStatus::Unknown(reason) => Ok(CheckOutcome::Unverified { document, reason }),
        SignatureStatus::Signed => {
            let artifact = state
                .provider
                .download_signed(&token, &provider_document_id)
                .await?;

            // Unique per attempt, so a losing attempt only ever removes its own file
            let nonce = Uuid::new_v4().simple().to_string();
            let relative = format!(
                "{}/{}",
                SIGNED_DIR,
                signed_file_name(document.id, &nonce, &document.title, Utc::now())
            );
            state.storage.write(&relative, &artifact).await?;

            let mut signed = document;
            signed.mark_signed(relative.clone())?;
            match store::commit(&state.db, &signed).await {
                Ok(document) => {
                    info!(
                        "Document {} signed, {} bytes stored at {}",
                        id,
                        artifact.len(),
                        relative
                    );
                    Ok(CheckOutcome::Signed(document))
                }
                Err(e) => {
                    if let Err(remove_err) = state.storage.remove(&relative).await {
                        warn!("Could not remove orphaned {}: {}", relative, remove_err);
                    }
                    Err(e)
                }
            }
        }
    }
}

/// Bytes of the stored signed artifact; only signed documents have one
pub async fn signed_artifact(state: &AppState, id: i64) -> Result<(Document, Vec<u8>), ApiError> {
    let document = store::fetch(&state.db, id).await?;
    let path = document.signed_artifact()?;
    let bytes = state.storage.read(path).await?;
    Ok((document, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use async_trait::async_trait;
    use docsign_core::{AccessToken, DocumentStatus, ProviderError, SigningProvider};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Barrier;

    const SIGNED_PDF: &[u8] = b"%PDF-1.4\n% signed\n%%EOF\n";

    /// Reports every document as signed; downloads wait until all
    /// concurrent checks have read the document
    struct SignedProvider {
        downloads: Barrier,
    }

    #[async_trait]
    impl SigningProvider for SignedProvider {
        async fn authenticate(&self) -> Result<AccessToken, ProviderError> {
            Ok(AccessToken::new("token"))
        }

        async fn upload_and_place_field(
            &self,
            _token: &AccessToken,
            _file_name: &str,
            _pdf: Vec<u8>,
            _placement: &Placement,
        ) -> Result<UploadOutcome, ProviderError> {
            Err(ProviderError::Upload("not used".into()))
        }

        async fn create_signing_link(
            &self,
            _token: &AccessToken,
            _provider_document_id: &str,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::Link("not used".into()))
        }

        async fn check_signed_status(
            &self,
            _token: &AccessToken,
            _provider_document_id: &str,
        ) -> SignatureStatus {
            SignatureStatus::Signed
        }

        async fn download_signed(
            &self,
            _token: &AccessToken,
            _provider_document_id: &str,
        ) -> Result<Vec<u8>, ProviderError> {
            self.downloads.wait().await;
            Ok(SIGNED_PDF.to_vec())
        }
    }

    async fn prepared_document(concurrent_checks: usize) -> (AppState, TempDir, i64) {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::new(
            Some("sqlite::memory:".to_string()),
            dir.path().to_path_buf(),
            1024,
        );
        let provider = SignedProvider {
            downloads: Barrier::new(concurrent_checks),
        };
        let state = AppState::new(&config, Arc::new(provider)).await.unwrap();

        let mut doc = store::insert(&state.db, "thesis.pdf", "documents/a.pdf")
            .await
            .unwrap();
        doc.mark_prepared("doc-42".into()).unwrap();
        let doc = store::commit(&state.db, &doc).await.unwrap();
        (state, dir, doc.id)
    }

    fn stored_artifacts(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path().join(SIGNED_DIR))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn check_stores_artifact_and_signs() {
        let (state, dir, id) = prepared_document(1).await;

        let document = match check_and_finalize(&state, id).await.unwrap() {
            CheckOutcome::Signed(document) => document,
            other => panic!("expected a signed outcome, got {:?}", other),
        };
        assert_eq!(document.status, DocumentStatus::Signed);

        let (_, bytes) = signed_artifact(&state, id).await.unwrap();
        assert_eq!(bytes, SIGNED_PDF);
        assert_eq!(stored_artifacts(&dir).len(), 1);
    }

    #[tokio::test]
    async fn concurrent_checks_keep_the_winning_artifact() {
        let (state, dir, id) = prepared_document(2).await;

        let (first, second) = tokio::join!(
            check_and_finalize(&state, id),
            check_and_finalize(&state, id)
        );

        let outcomes = [first, second];
        let signed = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(CheckOutcome::Signed(_))))
            .count();
        let conflicts = outcomes
            .iter()
            .filter(|o| matches!(o, Err(ApiError::Conflict(doc)) if *doc == id))
            .count();
        assert_eq!((signed, conflicts), (1, 1));

        // The committed artifact is still there and downloadable
        let (document, bytes) = signed_artifact(&state, id).await.unwrap();
        assert_eq!(document.status, DocumentStatus::Signed);
        assert_eq!(bytes, SIGNED_PDF);

        // The losing attempt removed only its own file
        let committed = document
            .signed_path
            .as_deref()
            .and_then(|p| p.strip_prefix("signed/"))
            .unwrap()
            .to_string();
        assert_eq!(stored_artifacts(&dir), vec![committed]);
    }
}
