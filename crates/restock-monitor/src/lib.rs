pub mod alert;
mod backoff;
pub mod error;
pub mod notifier;
pub mod proxy_pool;
pub mod storefront;
pub mod supervisor;
pub mod types;
pub mod worker;

pub use alert::{build_alert, Embed, Thumbnail, WebhookMessage, ALERT_COLOR};
pub use error::{AuthError, FetchError, NotifyError, PoolError};
pub use notifier::{Notifier, WebhookNotifier};
pub use proxy_pool::{resolve_proxies, ProxyPool};
pub use storefront::{Session, Storefront, StorefrontClient};
pub use supervisor::Supervisor;
pub use types::StockSnapshot;
pub use worker::{MonitorContext, MonitorWorker, Observation, WorkerSettings, WorkerState};
