//! Subcommand handlers.
//!
//! Configuration and resource loading errors are returned to `main` and end
//! the process. Once monitoring starts, failures are handled inside the
//! workers and only a shutdown signal stops the run.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use restock_core::{load_product_catalog, load_proxy_list, AppConfig, ProductCatalog};
use restock_monitor::{
    resolve_proxies, MonitorContext, ProxyPool, Storefront, StorefrontClient, Supervisor,
    WebhookNotifier, WorkerSettings,
};
use tokio::sync::watch;

/// Proxy counts before and after host resolution.
struct LoadedPool {
    pool: ProxyPool,
    listed: usize,
}

async fn load_proxy_pool(config: &AppConfig) -> anyhow::Result<LoadedPool> {
    let proxies = load_proxy_list(&config.proxies_path)?;
    let listed = proxies.len();
    let resolved = resolve_proxies(proxies).await;
    tracing::info!(listed, resolved = resolved.len(), "proxies loaded");

    let pool = ProxyPool::new(resolved).with_context(|| {
        format!(
            "no usable proxies in {} ({listed} listed)",
            config.proxies_path.display()
        )
    })?;
    Ok(LoadedPool { pool, listed })
}

fn load_catalog(config: &AppConfig, skus: &[String]) -> anyhow::Result<ProductCatalog> {
    let catalog = load_product_catalog(&config.products_path)?;
    for sku in catalog.missing(skus) {
        tracing::warn!(
            sku,
            "sku is not in the product catalog; alerts will be titled by sku"
        );
    }
    Ok(catalog)
}

/// Uses `overrides` in place of the configured SKUs when any are given.
/// Entries are trimmed, blanks dropped, and duplicates removed in order.
pub(crate) fn select_skus(configured: &[String], overrides: Vec<String>) -> Vec<String> {
    if overrides.is_empty() {
        return configured.to_vec();
    }
    let mut seen = HashSet::new();
    overrides
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Monitors every selected SKU until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the SKU list is empty, the proxy list or catalog
/// cannot be loaded, no proxy resolves, or the webhook client cannot be
/// built.
pub(crate) async fn run_monitor(
    config: &AppConfig,
    sku_overrides: Vec<String>,
) -> anyhow::Result<()> {
    let skus = select_skus(&config.skus, sku_overrides);
    anyhow::ensure!(!skus.is_empty(), "no SKUs to monitor");

    let LoadedPool { pool, .. } = load_proxy_pool(config).await?;
    let catalog = load_catalog(config, &skus)?;
    let notifier = WebhookNotifier::new(&config.webhook_url, config.request_timeout())
        .context("failed to build webhook client")?;

    let ctx = MonitorContext {
        storefront: Arc::new(StorefrontClient::from_app_config(config)),
        notifier: Arc::new(notifier),
        pool: Arc::new(pool),
        catalog: Arc::new(catalog),
        settings: WorkerSettings::from_app_config(config),
    };

    tracing::info!(
        env = %config.env,
        skus = skus.len(),
        store = %config.store_base_url,
        "starting restock monitor"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor = tokio::spawn(Supervisor::new(ctx, skus).run(shutdown_rx));

    crate::shutdown_signal().await;
    shutdown_tx.send_replace(true);
    supervisor.await.context("supervisor task failed")?;

    tracing::info!("restock monitor stopped");
    Ok(())
}

/// Loads every input the monitor needs and prints a summary.
///
/// # Errors
///
/// Returns an error if any input fails to load or no proxy resolves.
pub(crate) async fn run_check(config: &AppConfig) -> anyhow::Result<()> {
    let LoadedPool { pool, listed } = load_proxy_pool(config).await?;
    let catalog = load_catalog(config, &config.skus)?;
    let missing = catalog.missing(&config.skus);

    println!("configuration OK ({})", config.env);
    println!("  store:    {}", config.store_base_url);
    println!("  skus:     {}", config.skus.len());
    println!("  proxies:  {listed} listed, {} resolved", pool.len());
    println!(
        "  catalog:  {} products, {} of {} skus covered",
        catalog.len(),
        config.skus.len() - missing.len(),
        config.skus.len()
    );
    if !missing.is_empty() {
        println!("  missing:  {}", missing.join(", "));
    }
    Ok(())
}

/// Opens one session and prints a single snapshot for `sku`. No alert is
/// sent.
///
/// # Errors
///
/// Returns an error if the proxies cannot be loaded, the session cannot be
/// opened, or the fetch fails.
pub(crate) async fn run_probe(config: &AppConfig, sku: &str) -> anyhow::Result<()> {
    let LoadedPool { pool, .. } = load_proxy_pool(config).await?;
    let storefront = StorefrontClient::from_app_config(config);

    let proxy = pool.next();
    let host = proxy.host.clone();
    let session = storefront
        .open_session(proxy)
        .await
        .with_context(|| format!("failed to open storefront session via {host}"))?;
    let snapshot = storefront
        .fetch_availability(&session, sku)
        .await
        .with_context(|| format!("failed to fetch availability for {sku}"))?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
