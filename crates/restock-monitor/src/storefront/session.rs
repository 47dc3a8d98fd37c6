use std::time::Duration;

use reqwest::header::SET_COOKIE;
use reqwest::Client;
use restock_core::Proxy;

use super::headers::browser_headers;
use super::StorefrontClient;
use crate::error::AuthError;

/// An authorized storefront context bound to one proxy.
pub struct Session {
    pub(super) proxy: Proxy,
    pub(super) cookie: String,
    pub(super) client: Client,
}

impl Session {
    /// Builds a proxied client and loads the homepage to obtain the session
    /// cookie.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidProxy`] if the proxy cannot be configured.
    /// - [`AuthError::Http`] on network, proxy or TLS failure.
    /// - [`AuthError::MissingCookie`] if the response sets no cookie,
    ///   whatever its status.
    pub(super) async fn open(
        storefront: &StorefrontClient,
        proxy: Proxy,
    ) -> Result<Self, AuthError> {
        let client = proxied_client(&proxy, storefront.timeout)?;
        let url = storefront.homepage_url();

        let response = client
            .get(&url)
            .headers(browser_headers(storefront, None))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                status = status.as_u16(),
                proxy = %proxy.host,
                "homepage returned non-2xx; using any cookie it set"
            );
        }

        let cookie = collect_cookies(response.headers());
        if cookie.is_empty() {
            return Err(AuthError::MissingCookie { url });
        }

        Ok(Self {
            proxy,
            cookie,
            client,
        })
    }

    #[must_use]
    pub fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    #[must_use]
    pub fn cookie(&self) -> &str {
        &self.cookie
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("proxy", &self.proxy)
            .field("cookie", &"[redacted]")
            .finish_non_exhaustive()
    }
}

fn proxied_client(proxy: &Proxy, timeout: Duration) -> Result<Client, AuthError> {
    let proxy_url = format!("http://{}", proxy.host);
    let upstream = reqwest::Proxy::all(&proxy_url)
        .map_err(|e| AuthError::InvalidProxy {
            host: proxy.host.clone(),
            source: e,
        })?
        .basic_auth(&proxy.username, &proxy.password);

    let client = Client::builder()
        .proxy(upstream)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

/// Reduces every `Set-Cookie` header to its `name=value` pair and joins them
/// the way a browser would send them back.
fn collect_cookies(headers: &reqwest::header::HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|raw| raw.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('=') && !pair.starts_with('='))
        .collect::<Vec<_>>()
        .join("; ")
}
