//! HTTP client for the merchant `/pay` backend.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod pay;

pub use pay::{IDEMPOTENCY_KEY_HEADER, PayClient};

use reqwest::StatusCode;

/// Errors produced by the SDK HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, `429` and `5xx` are transient; everything else
    /// is a definitive answer from the backend.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => !e.is_decode() && !e.is_builder(),
            ClientError::Api { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            ClientError::Json(_) | ClientError::Url(_) => false,
        }
    }
}
