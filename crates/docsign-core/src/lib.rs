//! Document signing core logic
//!
//! This crate holds the parts of the signing workflow that do not depend on
//! the HTTP server or the database:
//!
//! - [`placement`]: signature field validation and the on-screen → native
//!   page coordinate transform
//! - [`lifecycle`]: the document record and its state transitions
//! - [`provider`]: the e-signature provider seam and its REST client

pub mod lifecycle;
pub mod placement;
pub mod provider;

pub use lifecycle::{signed_file_name, Document, DocumentStatus, LifecycleError, SignPlan};
pub use placement::{
    screen_to_native, PageMetrics, Placement, PlacementError, ScreenBox, MIN_FIELD_SIZE,
};
pub use provider::{
    AccessToken, ConfigError, ProviderConfig, ProviderError, SignNowClient, SignatureStatus,
    SigningProvider, UploadOutcome,
};
