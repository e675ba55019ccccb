//! The external AI classification boundary.
//!
//! The workflow never talks to a vision service directly; it consumes the
//! outcome of a [`ClassificationGateway`] call. Production code wires in
//! [`OpenAiVisionGateway`]; tests substitute a scripted fake.

mod vision;

pub use vision::{OpenAiVisionGateway, VisionConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::media::MediaKind;

/// Failure of an external classification call.
///
/// Gateway failures are values, never panics: callers apply the fail-open
/// policy and the upload proceeds regardless.
#[derive(Debug, Clone, Error)]
pub enum GatewayFailure {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success HTTP status.
    #[error("gateway returned status {0}")]
    Status(u16),

    /// The service answered but the body was not usable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayFailure {
    /// Human-readable reason, stored on the moderation record.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Abstracts the AI vision service: media bytes in, raw verdict text out.
///
/// Implementations must not retry internally on behalf of the workflow and
/// must surface every failure as a [`GatewayFailure`].
#[async_trait]
pub trait ClassificationGateway: Send + Sync {
    /// Submit media for classification and return the model's raw text.
    ///
    /// The returned text is untrusted; parsing and fallback policy belong
    /// to the caller (see [`crate::analysis::parse_analysis`]).
    async fn analyze(&self, media: &[u8], kind: MediaKind) -> Result<String, GatewayFailure>;
}
