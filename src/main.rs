//! Wormchain client - connects the signing account and serves its metrics
//!
//! Loads configuration, connects to the node, reports the account state and
//! keeps checking it until shutdown.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wormchain_client::config::Settings;
use wormchain_client::metrics::{self, MetricsServer, NodeIdentity};
use wormchain_client::{ChainConnection, Wallet};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Wormchain client v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for chain {} at {}",
        settings.client.chain_id, settings.client.grpc_url
    );

    // Load the signing identity
    let wallet = Wallet::from_env(
        &settings.wallet.private_key_env,
        &settings.client.bech32_prefix,
    )?;
    info!("Loaded wallet {}", wallet.address());

    // Connect to the node
    let connection = Arc::new(ChainConnection::connect(&settings.client, wallet).await?);
    let shutdown = CancellationToken::new();

    match connection.account_state(&shutdown).await {
        Ok(account) => info!(
            "Account {} has number {} and sequence {}",
            account.address, account.account_number, account.sequence
        ),
        Err(e) => warn!("Initial account query failed: {}", e),
    }

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(
            settings.metrics.clone(),
            NodeIdentity {
                address: connection.address(),
                chain_id: connection.chain_id().to_string(),
            },
        );
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Health check loop
    let health_handle = tokio::spawn({
        let connection = connection.clone();
        let shutdown = shutdown.clone();
        let interval = settings.client.health_check_interval_secs;
        async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(interval)) => {}
                }

                match connection.account_state(&shutdown).await {
                    Ok(account) => {
                        metrics::record_account_sequence(connection.chain_id(), account.sequence)
                    }
                    Err(e) => {
                        warn!("Account health check failed: {}", e);
                        metrics::record_health_check_failure(connection.chain_id());
                    }
                }
            }
        }
    });

    info!("Wormchain client is running");
    if settings.metrics.enabled {
        info!(
            "Metrics: http://{}:{}/metrics",
            settings.metrics.host, settings.metrics.port
        );
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");
    shutdown.cancel();

    if let Err(e) = health_handle.await {
        warn!("Health check task ended abnormally: {}", e);
    }
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Wormchain client stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,wormchain_client=debug,h2=warn,tower=warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
