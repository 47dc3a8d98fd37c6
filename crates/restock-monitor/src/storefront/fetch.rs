use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use super::headers::browser_headers;
use super::{Session, StorefrontClient};
use crate::error::FetchError;
use crate::types::{ProductAttributesResponse, StockSnapshot};

/// Fetches one stock snapshot and classifies failures.
///
/// A rejected or expired session shows up as 401/403, as an HTML page in
/// place of JSON, or as a body that is not JSON at all; those are
/// [`FetchError::TransientParse`]. Valid JSON with the wrong shape is a
/// schema problem and stays fatal.
pub(super) async fn fetch_availability(
    storefront: &StorefrontClient,
    session: &Session,
    sku: &str,
) -> Result<StockSnapshot, FetchError> {
    let url = storefront.product_attributes_url(sku);
    let http_err = |source: reqwest::Error| FetchError::Http {
        sku: sku.to_owned(),
        source,
    };

    let response = session
        .client
        .get(&url)
        .headers(browser_headers(storefront, Some(&session.cookie)))
        .send()
        .await
        .map_err(http_err)?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FetchError::TransientParse {
            sku: sku.to_owned(),
            reason: format!("HTTP {}", status.as_u16()),
        });
    }
    if !status.is_success() {
        return Err(FetchError::UnexpectedStatus {
            sku: sku.to_owned(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase);
    if let Some(ct) = content_type.as_deref() {
        if !is_json_content_type(ct) {
            return Err(FetchError::TransientParse {
                sku: sku.to_owned(),
                reason: format!("expected JSON, got content type '{ct}'"),
            });
        }
    }

    let body = response.text().await.map_err(http_err)?;
    parse_snapshot(sku, &body)
}

/// Parses a product-attributes body into a snapshot.
pub(crate) fn parse_snapshot(sku: &str, body: &str) -> Result<StockSnapshot, FetchError> {
    match serde_json::from_str::<ProductAttributesResponse>(body) {
        Ok(parsed) => Ok(StockSnapshot::from_attributes(sku, parsed.data)),
        Err(e) if e.is_syntax() || e.is_eof() => Err(FetchError::TransientParse {
            sku: sku.to_owned(),
            reason: format!("response is not JSON: {e}"),
        }),
        Err(e) => Err(FetchError::Deserialize {
            sku: sku.to_owned(),
            source: e,
        }),
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence == "application/json" || essence.ends_with("+json") || essence == "text/json"
}
