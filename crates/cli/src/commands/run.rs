//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{IngestConfig, StoreKind};
use std::time::Duration;
use tracing::info;

use super::source::load_config;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let config = load_config(&args.source, |config| {
        if let Some(workers) = args.workers {
            info!(workers, "Overriding worker pool size");
            config.workers.pool_size = workers;
        }
        if args.memory_store {
            config.store.kind = StoreKind::Memory;
        }
    })?;

    info!(
        broker = %config.broker.address(),
        topics = config.topics.len(),
        store = ?config.store.kind,
        workers = config.workers.pool_size,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        ingest: config,
        max_messages: (args.max_messages != 0).then_some(args.max_messages),
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    };

    info!("Starting router...");
    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Router execution failed")?;

    stats.print_summary();
    info!("Telemetry router finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &IngestConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Broker:");
    println!("  Address: {}", config.broker.address());
    println!("  Client id: {}", config.broker.client_id);
    println!(
        "  Credentials: {}",
        if config.broker.credentials().is_some() { "yes" } else { "no" }
    );

    println!("\nTopics ({}):", config.topics.len());
    for topic in config.topics.iter() {
        println!("  - {}", topic);
    }

    println!("\nStore: {:?}", config.store.kind);
    println!(
        "Workers: {} (queue {}, grace {}s)",
        config.workers.pool_size, config.workers.queue_capacity, config.workers.shutdown_grace_secs
    );
    if config.refresh.interval_secs > 0 {
        println!(
            "Refresh: every {}s on {}",
            config.refresh.interval_secs, config.refresh.topic
        );
    }

    println!();
}
