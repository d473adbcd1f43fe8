use std::time::Duration;
use thiserror::Error;

/// Failures talking to the signing provider.
///
/// Variants carrying a `String` hold the upstream response body (or the
/// transport error text) for operators. None of it is meant for end users.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider authentication failed: {0}")]
    Auth(String),

    #[error("Provider upload failed: {0}")]
    Upload(String),

    #[error("Provider signing link failed: {0}")]
    Link(String),

    #[error("Provider download failed: {0}")]
    Download(String),

    #[error("Provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Short machine-readable code for logs and API bodies
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Auth(_) => "PROVIDER_AUTH",
            ProviderError::Upload(_) => "PROVIDER_UPLOAD",
            ProviderError::Link(_) => "PROVIDER_LINK",
            ProviderError::Download(_) => "PROVIDER_DOWNLOAD",
            ProviderError::Timeout(_) => "PROVIDER_TIMEOUT",
            ProviderError::Transport(_) => "PROVIDER_TRANSPORT",
            ProviderError::Decode(_) => "PROVIDER_DECODE",
        }
    }
}
