//! Distributor - weighted log-packet distribution service
//!
//! # Usage
//!
//! ```bash
//! # Run with the default four local analyzers
//! distributor
//!
//! # Explicit analyzer set and tuning via environment
//! ANALYZERS_CONFIG="a:http://h1:8081/api/v1/analyze:0.5,b:http://h2:8082/api/v1/analyze:0.5" \
//!     distributor --port 8080 --log-level debug
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use splay_config::DistributorConfig;
use splay_dispatch::{DispatchConfig, DispatchPipeline, DistributorMetrics, RecoverySweeper};
use splay_distributor::AppState;
use splay_registry::{AnalyzerRegistry, HealthPolicy};
use splay_selector::Selector;

/// Distributor - weighted log-packet distribution service
#[derive(Parser, Debug)]
#[command(name = "distributor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Address to bind the ingest endpoint to
    #[arg(long, default_value = "0.0.0.0")]
    address: String,

    /// Port for the ingest endpoint
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = DistributorConfig::from_env().context("invalid configuration")?;

    let mut registry = AnalyzerRegistry::new(HealthPolicy {
        max_consecutive_failures: config.max_consecutive_failures,
        offline_timeout: config.offline_timeout,
    });
    for spec in &config.analyzers {
        registry.register(&spec.id, &spec.endpoint, spec.weight);
        tracing::info!(
            analyzer = %spec.id,
            endpoint = %spec.endpoint,
            weight = spec.weight,
            "analyzer registered"
        );
    }
    let registry = Arc::new(registry);
    let metrics = Arc::new(DistributorMetrics::new());

    let cancel = CancellationToken::new();

    let pipeline = Arc::new(
        DispatchPipeline::spawn(
            DispatchConfig {
                queue_capacity: config.queue_capacity,
                workers: config.worker_max,
                request_timeout: config.request_timeout,
            },
            Arc::clone(&registry),
            Arc::clone(&metrics),
            cancel.child_token(),
        )
        .context("failed to start dispatch pipeline")?,
    );

    let sweeper = RecoverySweeper::new(
        Arc::clone(&registry),
        config.sweep_interval,
        cancel.child_token(),
    )
    .spawn();

    let state = Arc::new(AppState {
        registry: Arc::clone(&registry),
        selector: Selector::new(config.deficit_threshold),
        pipeline: Arc::clone(&pipeline),
        metrics: Arc::clone(&metrics),
    });

    tracing::info!(
        analyzers = registry.len(),
        workers = pipeline.worker_count(),
        queue_capacity = config.queue_capacity,
        "distributor initialized"
    );

    // Turn SIGINT/SIGTERM into a cancellation
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let bind_address = format!("{}:{}", cli.address, cli.port);
    splay_distributor::run(&bind_address, state, cancel.clone()).await?;

    // Ingest has stopped; stop background work and settle the counters
    cancel.cancel();
    pipeline.shutdown().await;
    let _ = sweeper.await;

    let snapshot = metrics.snapshot();
    tracing::info!(
        packets_received = snapshot.packets_received,
        packets_processed = snapshot.packets_processed,
        packets_dropped = snapshot.packets_dropped,
        messages_processed = snapshot.messages_processed,
        "distributor stopped"
    );

    Ok(())
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}

/// Cancel the token on SIGINT or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
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

    tracing::info!("shutdown signal received");
    cancel.cancel();
}
