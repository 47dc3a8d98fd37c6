//! HTTP client for the retailer's storefront.
//!
//! A [`Session`] is one proxy binding plus the homepage cookie that authorizes
//! product-attribute requests. [`StorefrontClient`] opens sessions and fetches
//! stock snapshots through them; both calls send the same browser-like header
//! set so the API answers as it would for a page script.

mod fetch;
mod headers;
mod session;

use std::future::Future;
use std::time::Duration;

use restock_core::{AppConfig, Proxy};

use crate::error::{AuthError, FetchError};
use crate::types::StockSnapshot;

pub use session::Session;

/// The storefront operations a monitor worker depends on.
pub trait Storefront: Send + Sync + 'static {
    type Session: Send + Sync;

    /// Opens a new session through `proxy`.
    fn open_session(
        &self,
        proxy: Proxy,
    ) -> impl Future<Output = Result<Self::Session, AuthError>> + Send;

    /// Fetches the current availability of `sku` using `session`.
    fn fetch_availability(
        &self,
        session: &Self::Session,
        sku: &str,
    ) -> impl Future<Output = Result<StockSnapshot, FetchError>> + Send;
}

/// Connection settings shared by every session.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    base_url: String,
    origin: String,
    store_scope: String,
    user_agent: String,
    timeout: Duration,
}

impl StorefrontClient {
    /// `base_url` is the storefront origin, e.g. `https://www.example.com`.
    #[must_use]
    pub fn new(base_url: &str, store_scope: &str, user_agent: &str, timeout: Duration) -> Self {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let origin = extract_origin(&base_url);
        Self {
            base_url,
            origin,
            store_scope: store_scope.to_owned(),
            user_agent: user_agent.to_owned(),
            timeout,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            &config.store_base_url,
            &config.store_scope,
            &config.user_agent,
            config.request_timeout(),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn homepage_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    fn product_attributes_url(&self, sku: &str) -> String {
        format!("{}/remote/v1/product-attributes/{sku}", self.base_url)
    }
}

impl Storefront for StorefrontClient {
    type Session = Session;

    async fn open_session(&self, proxy: Proxy) -> Result<Session, AuthError> {
        Session::open(self, proxy).await
    }

    async fn fetch_availability(
        &self,
        session: &Session,
        sku: &str,
    ) -> Result<StockSnapshot, FetchError> {
        fetch::fetch_availability(self, session, sku).await
    }
}

/// Extracts the scheme+host origin from a base URL.
///
/// Given `"https://www.example.com/shop"`, returns `"https://www.example.com"`.
fn extract_origin(base_url: &str) -> String {
    reqwest::Url::parse(base_url).map_or_else(
        |_| base_url.to_owned(),
        |u| u.origin().ascii_serialization(),
    )
}
