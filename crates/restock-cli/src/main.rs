mod commands;

use clap::{Parser, Subcommand};
use restock_core::{AppConfig, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "restock")]
#[command(about = "Storefront restock monitor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Monitor the configured SKUs until interrupted (default)
    Run {
        /// Monitor these SKUs instead of `RESTOCK_SKUS`; repeatable
        #[arg(long = "sku", value_name = "SKU")]
        skus: Vec<String>,
    },
    /// Validate configuration, proxies and catalog, then exit
    Check,
    /// Fetch one availability snapshot for a SKU and print it as JSON
    Probe {
        #[arg(value_name = "SKU")]
        sku: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = restock_core::load_app_config()?;
    init_tracing(&config)?;
    tracing::debug!(config = ?config, "configuration loaded");

    match cli.command.unwrap_or(Commands::Run { skus: Vec::new() }) {
        Commands::Run { skus } => commands::run_monitor(&config, skus).await,
        Commands::Check => commands::run_check(&config).await,
        Commands::Probe { sku } => commands::run_probe(&config, &sku).await,
    }
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping monitor workers");
}
