//! SignNow REST client

use async_trait::async_trait;
use reqwest::{multipart, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::{
    AccessToken, ProviderConfig, ProviderError, SignatureStatus, SigningProvider, UploadOutcome,
    SIGNER_ROLE,
};
use crate::placement::Placement;

const FIELD_NAME: &str = "Signature";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct LinkResponse {
    url_no_signup: String,
}

#[derive(Deserialize)]
struct DocumentMetadata {
    #[serde(default)]
    signatures: Option<Vec<serde_json::Value>>,
}

/// One field descriptor in a `PUT /document/{id}` body
#[derive(Debug, Serialize)]
struct FieldDescriptor<'a> {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    #[serde(rename = "type")]
    field_type: &'a str,
    page_number: u32,
    role: &'a str,
    required: bool,
    name: &'a str,
}

impl<'a> FieldDescriptor<'a> {
    fn signature(placement: &Placement) -> Self {
        Self {
            x: placement.x,
            y: placement.y,
            width: placement.width,
            height: placement.height,
            field_type: "signature",
            page_number: placement.page,
            role: SIGNER_ROLE,
            required: true,
            name: FIELD_NAME,
        }
    }
}

#[derive(Clone)]
pub struct SignNowClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for SignNowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignNowClient")
            .field("config", &self.config)
            .finish()
    }
}

impl SignNowClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.config.timeout)
        } else {
            ProviderError::Transport(err.to_string())
        }
    }

    /// Pass successful responses through; turn anything else into `kind`
    /// carrying the upstream status and body.
    async fn expect_success(
        response: Response,
        kind: fn(String) -> ProviderError,
    ) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(kind(format!("{}: {}", status.as_u16(), body)))
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ProviderError> {
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.config.timeout)
            } else {
                ProviderError::Decode(e.to_string())
            }
        })
    }

    async fn upload(
        &self,
        token: &AccessToken,
        file_name: &str,
        pdf: Vec<u8>,
    ) -> Result<String, ProviderError> {
        let part = multipart::Part::bytes(pdf)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ProviderError::Upload(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/document"))
            .bearer_auth(token.secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::expect_success(response, ProviderError::Upload).await?;

        let uploaded: UploadResponse = self.decode(response).await?;
        Ok(uploaded.id)
    }

    async fn place_field(
        &self,
        token: &AccessToken,
        provider_document_id: &str,
        placement: &Placement,
    ) -> Result<(), ProviderError> {
        let body = json!({ "fields": [FieldDescriptor::signature(placement)] });

        let response = self
            .http
            .put(self.url(&format!("/document/{}", provider_document_id)))
            .bearer_auth(token.secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::expect_success(response, ProviderError::Upload).await?;
        Ok(())
    }
}

#[async_trait]
impl SigningProvider for SignNowClient {
    async fn authenticate(&self) -> Result<AccessToken, ProviderError> {
        let form = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
            ("grant_type", "password"),
            ("scope", "*"),
        ];

        let response = self
            .http
            .post(self.url("/oauth2/token"))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.config.basic_token),
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::expect_success(response, ProviderError::Auth).await?;

        let token: TokenResponse = self.decode(response).await?;
        debug!("Obtained provider access token");
        Ok(AccessToken::new(token.access_token))
    }

    async fn upload_and_place_field(
        &self,
        token: &AccessToken,
        file_name: &str,
        pdf: Vec<u8>,
        placement: &Placement,
    ) -> Result<UploadOutcome, ProviderError> {
        let size = pdf.len();
        let provider_document_id = self.upload(token, file_name, pdf).await?;
        info!(
            "Uploaded {} ({} bytes) to provider as {}",
            file_name, size, provider_document_id
        );

        let field_placed = match self.place_field(token, &provider_document_id, placement).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to add signature field to provider document {}: {}",
                    provider_document_id, e
                );
                false
            }
        };

        Ok(UploadOutcome {
            provider_document_id,
            field_placed,
        })
    }

    async fn create_signing_link(
        &self,
        token: &AccessToken,
        provider_document_id: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.url("/link"))
            .bearer_auth(token.secret())
            .json(&json!({ "document_id": provider_document_id }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::expect_success(response, ProviderError::Link).await?;

        let link: LinkResponse = self.decode(response).await?;
        Ok(link.url_no_signup)
    }

    async fn check_signed_status(
        &self,
        token: &AccessToken,
        provider_document_id: &str,
    ) -> SignatureStatus {
        let result: Result<DocumentMetadata, ProviderError> = async {
            let response = self
                .http
                .get(self.url(&format!("/document/{}", provider_document_id)))
                .bearer_auth(token.secret())
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            let response = Self::expect_success(response, ProviderError::Transport).await?;
            self.decode::<DocumentMetadata>(response).await
        }
        .await;

        match result {
            Ok(metadata) => match metadata.signatures {
                Some(signatures) if !signatures.is_empty() => SignatureStatus::Signed,
                _ => SignatureStatus::NotSigned,
            },
            Err(e) => {
                warn!(
                    "Could not fetch status of provider document {}: {}",
                    provider_document_id, e
                );
                SignatureStatus::Unknown(e.to_string())
            }
        }
    }

    async fn download_signed(
        &self,
        token: &AccessToken,
        provider_document_id: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http
            .get(self.url(&format!("/document/{}/download", provider_document_id)))
            .query(&[("type", "collapsed")])
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = Self::expect_success(response, ProviderError::Download).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn field_descriptor_matches_provider_shape() {
        let placement = Placement {
            page: 2,
            x: 50,
            y: 60,
            width: 100,
            height: 30,
        };
        let body = serde_json::to_value(FieldDescriptor::signature(&placement)).unwrap();
        assert_eq!(
            body,
            json!({
                "x": 50,
                "y": 60,
                "width": 100,
                "height": 30,
                "type": "signature",
                "page_number": 2,
                "role": "Signer 1",
                "required": true,
                "name": "Signature",
            })
        );
    }

    #[test]
    fn debug_does_not_leak_token() {
        let token = AccessToken::new("live-token-value");
        assert_eq!(format!("{:?}", token), "AccessToken(<redacted>)");
    }
}
