//! Merchant backend configuration.

use crate::utils::backoff::RetryPolicy;
use url::Url;

/// Where the `/pay` endpoints live and how transient failures are retried.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Root URL the `pay/…` paths are joined onto.
    pub base_url: Url,
    /// Retry policy for `prepare` and `complete`.
    pub retry: RetryPolicy,
    /// Per-request timeout.
    pub request_timeout: std::time::Duration,
}
