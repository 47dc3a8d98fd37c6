use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, COOKIE,
    ORIGIN, USER_AGENT,
};

use super::StorefrontClient;

const X_STORE_SCOPE: &str = "x-store-scope";
const X_REQUESTED_WITH: &str = "x-requested-with";

/// Header set a storefront page script sends, plus `Cookie` when a session
/// cookie is supplied. Values that are not valid header text are skipped.
pub(super) fn browser_headers(client: &StorefrontClient, cookie: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static(X_REQUESTED_WITH),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    let dynamic = [
        (USER_AGENT, client.user_agent.as_str()),
        (HeaderName::from_static(X_STORE_SCOPE), client.store_scope.as_str()),
        (ORIGIN, client.origin.as_str()),
    ];
    for (name, value) in dynamic {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(name, v);
            }
            Err(_) => tracing::warn!(header = %name, "skipping header with invalid value"),
        }
    }

    if let Some(cookie) = cookie {
        match HeaderValue::from_str(cookie) {
            Ok(v) => {
                headers.insert(COOKIE, v);
            }
            Err(_) => tracing::warn!("session cookie is not a valid header value"),
        }
    }

    headers
}
