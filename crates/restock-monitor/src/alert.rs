//! Webhook payload for an in-stock alert.

use std::time::Duration;

use restock_core::ProductInfo;
use serde::{Deserialize, Serialize};

use crate::types::StockSnapshot;

pub const ALERT_COLOR: u32 = 4_437_377;

const FOUND_MESSAGE: &str = "Restock monitor found an item in stock!";

/// JSON body posted to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub color: u32,
    pub thumbnail: Thumbnail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Builds the alert for the `hits`-th consecutive in-stock observation.
///
/// When `hits` reaches `threshold` the content carries a notice that the
/// worker is about to sleep for `cooldown`. Products missing from the catalog
/// are titled by SKU.
#[must_use]
pub fn build_alert(
    product: Option<&ProductInfo>,
    snapshot: &StockSnapshot,
    hits: u32,
    threshold: u32,
    cooldown: Duration,
) -> WebhookMessage {
    let mut content = FOUND_MESSAGE.to_owned();
    if hits >= threshold {
        content.push_str(&format!(
            "\n\n*Item has been found {threshold} times, going to sleep for {}!*",
            humanize(cooldown)
        ));
    }

    let (title, link, thumbnail) = match product {
        Some(p) => (p.display_name.clone(), p.link.as_str(), p.thumbnail_url.clone()),
        None => (snapshot.sku.clone(), "", String::new()),
    };

    let mut description = String::new();
    if !link.is_empty() {
        description.push_str(&format!("<{link}>\n\n"));
    }
    description.push_str(&format!(
        "SKU: {}\nPrice: ${:.2}\nStock: {}",
        snapshot.sku, snapshot.price, snapshot.stock_count
    ));

    WebhookMessage {
        content,
        embeds: vec![Embed {
            title,
            description,
            color: ALERT_COLOR,
            thumbnail: Thumbnail { url: thumbnail },
        }],
    }
}

/// Renders a duration in the largest whole unit: `"2 hours"`, `"90 minutes"`.
fn humanize(d: Duration) -> String {
    let secs = d.as_secs();
    let (value, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}
