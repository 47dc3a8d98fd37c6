//! Runs one [`MonitorWorker`] per SKU and keeps it alive.
//!
//! Workers never return on their own before shutdown, so the only abnormal
//! exit is a panic. A panicked worker is logged and respawned with fresh state
//! after the error delay.

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::notifier::Notifier;
use crate::storefront::Storefront;
use crate::worker::{sleep_or_shutdown, MonitorContext, MonitorWorker};

pub struct Supervisor<S, N> {
    ctx: MonitorContext<S, N>,
    skus: Vec<String>,
}

impl<S: Storefront, N: Notifier> Supervisor<S, N> {
    #[must_use]
    pub fn new(ctx: MonitorContext<S, N>, skus: Vec<String>) -> Self {
        Self { ctx, skus }
    }

    /// Spawns every worker and waits until all of them have stopped.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let mut tasks = JoinSet::new();
        for sku in self.skus {
            tasks.spawn(supervise(sku, self.ctx.clone(), shutdown.clone()));
        }
        tracing::info!(workers = tasks.len(), "monitor workers started");

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "worker supervisor task failed");
            }
        }
        tracing::info!("all monitor workers stopped");
    }
}

async fn supervise<S: Storefront, N: Notifier>(
    sku: String,
    ctx: MonitorContext<S, N>,
    mut shutdown: watch::Receiver<bool>,
) {
    let restart_delay = ctx.settings.error_delay;
    loop {
        let mut worker = MonitorWorker::new(sku.clone(), ctx.clone());
        let mut worker_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move { worker.run(&mut worker_shutdown).await });

        match handle.await {
            Ok(()) => return,
            Err(e) if e.is_panic() => {
                tracing::error!(
                    sku = %sku,
                    error = %e,
                    "monitor worker panicked; restarting"
                );
                if sleep_or_shutdown(restart_delay, &mut shutdown).await {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(sku = %sku, error = %e, "monitor worker cancelled");
                return;
            }
        }
    }
}
