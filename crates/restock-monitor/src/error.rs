use std::time::Duration;

use thiserror::Error;

/// Errors building a [`ProxyPool`](crate::ProxyPool).
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("proxy pool is empty")]
    Empty,
}

/// Failure to open an authenticated storefront session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// reqwest rejected the proxy URL or credentials.
    #[error("invalid proxy {host}: {source}")]
    InvalidProxy {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    /// Network, proxy or TLS failure while loading the homepage.
    #[error("HTTP error opening session: {0}")]
    Http(#[from] reqwest::Error),

    /// The homepage answered but set no cookie.
    #[error("no session cookie returned by {url}")]
    MissingCookie { url: String },
}

/// Failure to fetch a stock snapshot.
///
/// [`FetchError::TransientParse`] means the session is no longer accepted and
/// should be replaced. Every other variant is fatal for the current polling
/// cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("session rejected while fetching {sku}: {reason}")]
    TransientParse { sku: String, reason: String },

    #[error("HTTP error fetching {sku}: {source}")]
    Http {
        sku: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} fetching {sku}")]
    UnexpectedStatus { sku: String, status: u16 },

    #[error("JSON deserialization error for {sku}: {source}")]
    Deserialize {
        sku: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// `true` when a fresh session is likely to fix the failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::TransientParse { .. })
    }
}

/// Failure to deliver a webhook alert.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to serialize webhook message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HTTP error sending webhook: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Duration },

    #[error("unexpected HTTP status {status} from webhook")]
    UnexpectedStatus { status: u16 },
}

impl NotifyError {
    /// Server-requested delay carried by the failure, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            NotifyError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
