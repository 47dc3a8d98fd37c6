//! Webhook delivery for in-stock alerts.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, StatusCode};

use crate::alert::WebhookMessage;
use crate::error::NotifyError;

/// Sends alerts and reports any server-requested delay.
pub trait Notifier: Send + Sync + 'static {
    /// Posts `message`; resolves to the `Retry-After` delay, zero when the
    /// server did not ask for one.
    fn send(
        &self,
        message: &WebhookMessage,
    ) -> impl Future<Output = Result<Duration, NotifyError>> + Send;
}

/// Posts alerts to a webhook URL over a direct connection.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.to_owned(),
        })
    }
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("webhook_url", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl Notifier for WebhookNotifier {
    async fn send(&self, message: &WebhookMessage) -> Result<Duration, NotifyError> {
        let body = serde_json::to_vec(message)?;
        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NotifyError::RateLimited {
                retry_after: retry_after.unwrap_or(Duration::ZERO),
            });
        }
        if !status.is_success() {
            return Err(NotifyError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        Ok(retry_after.unwrap_or(Duration::ZERO))
    }
}

/// Reads `Retry-After` as a number of seconds. Fractional values are
/// accepted; negative, non-finite, and HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let secs = raw.parse::<f64>().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}
