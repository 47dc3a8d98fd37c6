//! Per-SKU availability monitor.
//!
//! A worker cycles through
//! `AcquiringSession → Polling → (Available | Unavailable) → … → Cooldown →
//! AcquiringSession` until shutdown. Nothing that happens inside the loop
//! ends it: failed sessions and failed fetches back off and retry, failed
//! alerts are logged and polling continues.
//!
//! The decision logic lives in [`WorkerState`] so it can be exercised without
//! any I/O; [`MonitorWorker`] drives it against a [`Storefront`] and a
//! [`Notifier`].

use std::sync::Arc;
use std::time::Duration;

use restock_core::{AppConfig, ProductCatalog};
use tokio::sync::watch;

use crate::alert::build_alert;
use crate::backoff::error_backoff;
use crate::notifier::Notifier;
use crate::proxy_pool::ProxyPool;
use crate::storefront::Storefront;
use crate::types::StockSnapshot;

/// Delay constants for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Default interval between polls.
    pub monitor_delay: Duration,
    /// First back-off after a failed session or fetch.
    pub error_delay: Duration,
    /// Upper bound for the exponential error back-off.
    pub max_error_delay: Duration,
    /// Sleep after `cooldown_after_hits` consecutive in-stock observations.
    pub cooldown: Duration,
    pub cooldown_after_hits: u32,
}

impl WorkerSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            monitor_delay: config.monitor_delay(),
            error_delay: config.error_delay(),
            max_error_delay: config.max_error_delay(),
            cooldown: config.cooldown(),
            cooldown_after_hits: config.cooldown_after_hits,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            monitor_delay: Duration::from_secs(300),
            error_delay: Duration::from_secs(10),
            max_error_delay: Duration::from_secs(300),
            cooldown: Duration::from_secs(2 * 60 * 60),
            cooldown_after_hits: 3,
        }
    }
}

/// What a single snapshot means for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Unavailable,
    /// `hits` consecutive in-stock observations so far; `cooldown` is set
    /// when that count reached the threshold.
    Available { hits: u32, cooldown: bool },
}

/// Mutable per-SKU state. Owned by exactly one worker.
#[derive(Debug, Clone)]
pub struct WorkerState {
    sku: String,
    consecutive_hits: u32,
    poll_interval: Duration,
}

impl WorkerState {
    #[must_use]
    pub fn new(sku: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            sku: sku.into(),
            consecutive_hits: 0,
            poll_interval,
        }
    }

    #[must_use]
    pub fn sku(&self) -> &str {
        &self.sku
    }

    #[must_use]
    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Applies one snapshot. An out-of-stock snapshot always clears the hit
    /// counter; an in-stock one increments it.
    pub fn observe(&mut self, snapshot: &StockSnapshot, threshold: u32) -> Observation {
        if !snapshot.in_stock {
            self.consecutive_hits = 0;
            return Observation::Unavailable;
        }
        self.consecutive_hits = self.consecutive_hits.saturating_add(1);
        Observation::Available {
            hits: self.consecutive_hits,
            cooldown: self.consecutive_hits >= threshold,
        }
    }

    /// Adopts `retry_after` as the poll interval when it is strictly longer
    /// than the current one. Returns whether the interval changed.
    pub fn apply_retry_after(&mut self, retry_after: Duration) -> bool {
        if retry_after > self.poll_interval {
            self.poll_interval = retry_after;
            true
        } else {
            false
        }
    }

    /// Clears the hit counter after the cooldown sleep.
    pub fn finish_cooldown(&mut self) {
        self.consecutive_hits = 0;
    }

    /// Restores the default interval; called for every new session.
    pub fn reset_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }
}

/// Shared collaborators handed to every worker.
pub struct MonitorContext<S, N> {
    pub storefront: Arc<S>,
    pub notifier: Arc<N>,
    pub pool: Arc<ProxyPool>,
    pub catalog: Arc<ProductCatalog>,
    pub settings: WorkerSettings,
}

impl<S, N> Clone for MonitorContext<S, N> {
    fn clone(&self) -> Self {
        Self {
            storefront: Arc::clone(&self.storefront),
            notifier: Arc::clone(&self.notifier),
            pool: Arc::clone(&self.pool),
            catalog: Arc::clone(&self.catalog),
            settings: self.settings.clone(),
        }
    }
}

/// How a polling cycle on one session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Cooldown,
    SessionExpired,
    FetchFailed,
    Shutdown,
}

pub struct MonitorWorker<S: Storefront, N: Notifier> {
    ctx: MonitorContext<S, N>,
    state: WorkerState,
    /// Consecutive failed session opens; cleared when a session opens.
    open_failures: u32,
    /// Consecutive failed fetches; cleared by a successful fetch.
    fetch_failures: u32,
}

impl<S: Storefront, N: Notifier> MonitorWorker<S, N> {
    #[must_use]
    pub fn new(sku: impl Into<String>, ctx: MonitorContext<S, N>) -> Self {
        let state = WorkerState::new(sku, ctx.settings.monitor_delay);
        Self {
            ctx,
            state,
            open_failures: 0,
            fetch_failures: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Runs until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&mut self, shutdown: &mut watch::Receiver<bool>) {
        tracing::info!(sku = %self.state.sku, "monitor worker started");
        loop {
            let Some(session) = self.acquire_session(shutdown).await else {
                break;
            };

            match self.poll(&session, shutdown).await {
                SessionEnd::Shutdown => break,
                SessionEnd::Cooldown => {}
                SessionEnd::SessionExpired | SessionEnd::FetchFailed => {
                    if self.back_off(self.fetch_failures, shutdown).await {
                        break;
                    }
                }
            }
        }
        tracing::info!(sku = %self.state.sku, "monitor worker stopped");
    }

    /// Draws proxies until a session opens. Returns `None` on shutdown.
    async fn acquire_session(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<S::Session> {
        loop {
            if is_shutdown(shutdown) {
                return None;
            }

            let proxy = self.ctx.pool.next();
            let host = proxy.host.clone();
            tracing::debug!(sku = %self.state.sku, proxy = %host, "initializing session");

            match self.ctx.storefront.open_session(proxy).await {
                Ok(session) => {
                    tracing::info!(sku = %self.state.sku, proxy = %host, "session created");
                    self.open_failures = 0;
                    self.state.reset_poll_interval(self.ctx.settings.monitor_delay);
                    return Some(session);
                }
                Err(e) => {
                    tracing::warn!(
                        sku = %self.state.sku,
                        proxy = %host,
                        error = %e,
                        "could not create session; retrying with next proxy"
                    );
                    self.open_failures = self.open_failures.saturating_add(1);
                    if self.back_off(self.open_failures, shutdown).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn poll(
        &mut self,
        session: &S::Session,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let sku = self.state.sku.clone();
        let threshold = self.ctx.settings.cooldown_after_hits;

        loop {
            if is_shutdown(shutdown) {
                return SessionEnd::Shutdown;
            }

            tracing::debug!(sku = %sku, "checking product availability");
            let snapshot = match self.ctx.storefront.fetch_availability(session, &sku).await {
                Ok(snapshot) => snapshot,
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        sku = %sku,
                        error = %e,
                        "session no longer accepted; reinitializing"
                    );
                    self.fetch_failures = self.fetch_failures.saturating_add(1);
                    return SessionEnd::SessionExpired;
                }
                Err(e) => {
                    tracing::error!(sku = %sku, error = %e, "availability check failed");
                    self.fetch_failures = self.fetch_failures.saturating_add(1);
                    return SessionEnd::FetchFailed;
                }
            };
            self.fetch_failures = 0;

            match self.state.observe(&snapshot, threshold) {
                Observation::Unavailable => {
                    tracing::info!(sku = %sku, "product unavailable");
                }
                Observation::Available { hits, cooldown } => {
                    tracing::info!(
                        sku = %sku,
                        hits,
                        price = %snapshot.price,
                        stock = snapshot.stock_count,
                        "product available"
                    );
                    self.alert(&snapshot, hits).await;

                    if cooldown {
                        tracing::info!(
                            sku = %sku,
                            hits,
                            cooldown_ms = duration_ms(self.ctx.settings.cooldown),
                            "found item repeatedly; cooling down"
                        );
                        if sleep_or_shutdown(self.ctx.settings.cooldown, shutdown).await {
                            return SessionEnd::Shutdown;
                        }
                        self.state.finish_cooldown();
                        return SessionEnd::Cooldown;
                    }
                }
            }

            if sleep_or_shutdown(self.state.poll_interval, shutdown).await {
                return SessionEnd::Shutdown;
            }
        }
    }

    /// Sends the alert for the `hits`-th sighting and applies any
    /// server-requested slowdown. Delivery failures never stop polling.
    async fn alert(&mut self, snapshot: &StockSnapshot, hits: u32) {
        let settings = &self.ctx.settings;
        let message = build_alert(
            self.ctx.catalog.get(&self.state.sku),
            snapshot,
            hits,
            settings.cooldown_after_hits,
            settings.cooldown,
        );

        let retry_after = match self.ctx.notifier.send(&message).await {
            Ok(retry_after) => Some(retry_after),
            Err(e) => {
                tracing::error!(
                    sku = %self.state.sku,
                    error = %e,
                    "error sending webhook message"
                );
                e.retry_after()
            }
        };

        if let Some(retry_after) = retry_after {
            if self.state.apply_retry_after(retry_after) {
                tracing::info!(
                    sku = %self.state.sku,
                    poll_interval_ms = duration_ms(retry_after),
                    "webhook requested slower polling"
                );
            }
        }
    }

    /// Sleeps the error back-off for the `attempt`-th consecutive failure.
    /// Returns `true` if shutdown was requested meanwhile.
    async fn back_off(&self, attempt: u32, shutdown: &mut watch::Receiver<bool>) -> bool {
        let delay = error_backoff(
            self.ctx.settings.error_delay,
            self.ctx.settings.max_error_delay,
            attempt,
        );
        tracing::info!(
            sku = %self.state.sku,
            attempt,
            delay_ms = duration_ms(delay),
            "backing off before retry"
        );
        sleep_or_shutdown(delay, shutdown).await
    }
}

fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Sleeps for `duration` unless shutdown is requested first. Returns `true`
/// on shutdown, including when the sender has been dropped.
pub(crate) async fn sleep_or_shutdown(
    duration: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    if is_shutdown(shutdown) {
        return true;
    }

    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    return true;
                }
            }
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;
