//! Router orchestrator - coordinates all components.
//!
//! Wiring: broker session → Subscriber → bounded queue → WorkerPool →
//! SensorStore. Shutdown order: stop the subscriber, drain the pool within
//! the grace period, then disconnect from the broker.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{IngestConfig, SensorStore, StoreKind};
use dispatcher::{DispatchMetrics, MemoryStore, MessageProcessor, PgStore, WorkerPool};
use tracing::{info, warn};
use transport::{BrokerClient, BrokerEvents, Subscriber, SubscriberOptions};

use super::PipelineStats;
use crate::error::CliError;

/// How often the message limit is checked
const LIMIT_POLL: Duration = Duration::from_millis(100);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Effective router configuration
    pub ingest: IngestConfig,

    /// Stop after this many processed messages (None = unlimited)
    pub max_messages: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main router orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run against the configured MQTT broker and store until `shutdown`
    /// resolves or a run limit is reached
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let ingest = &self.config.ingest;
        // room for every subscription plus a refresh request
        let (client, events) = transport::mqtt_session(&ingest.broker, ingest.topics.len() + 2);

        match ingest.store.kind {
            StoreKind::Memory => {
                info!("Using in-memory store, measurements are not persisted");
                let store = Arc::new(MemoryStore::new());
                self.run_with(store, client, events, shutdown).await
            }
            StoreKind::Postgres => {
                let store = PgStore::connect(&ingest.store)
                    .await
                    .map_err(|e| CliError::store_connection("postgres", e.to_string()))?;
                let store = Arc::new(store);
                let result = self
                    .run_with(Arc::clone(&store), client, events, shutdown)
                    .await;
                store.close().await;
                result
            }
        }
    }

    /// Run with an explicit store and broker session
    pub async fn run_with<S, C, E>(
        &self,
        store: Arc<S>,
        client: C,
        events: E,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PipelineStats>
    where
        S: SensorStore + Send + Sync + 'static,
        C: BrokerClient,
        E: BrokerEvents,
    {
        let start_time = Instant::now();
        let ingest = &self.config.ingest;
        let grace = Duration::from_secs(ingest.workers.shutdown_grace_secs);

        // Setup workers
        let (queue_tx, queue_rx) = async_channel::bounded(ingest.workers.queue_capacity);
        let processor = Arc::new(MessageProcessor::new(store, ingest.identity));
        let pool = WorkerPool::spawn(Arc::clone(&processor), queue_rx, ingest.workers.pool_size);
        let dispatch_metrics = Arc::clone(pool.metrics());

        // Connect and subscribe
        info!(
            address = %ingest.broker.address(),
            topics = ingest.topics.len(),
            "Connecting to broker..."
        );
        let options = SubscriberOptions::from_config(ingest);
        let subscriber = match Subscriber::connect(client, events, options, queue_tx).await {
            Ok(subscriber) => subscriber,
            Err(e) => {
                pool.shutdown(grace).await;
                return Err(
                    CliError::broker_connection(ingest.broker.address(), e.to_string()).into(),
                );
            }
        };

        let refresh = transport::spawn_periodic_refresh(
            subscriber.client().clone(),
            ingest.refresh.clone(),
            subscriber.stop_signal(),
        );

        info!(
            workers = pool.size(),
            max_messages = ?self.config.max_messages,
            "Router running"
        );

        tokio::select! {
            _ = shutdown => {
                info!("Received shutdown signal, stopping router...");
            }
            _ = wait_for_limit(&dispatch_metrics, self.config.max_messages) => {
                info!(messages = dispatch_metrics.processed(), "Reached max messages limit");
            }
            _ = wait_for_timeout(self.config.timeout) => {
                warn!(timeout_secs = ?self.config.timeout.map(|t| t.as_secs()), "Run timed out");
            }
        }

        // Shutdown
        info!("Shutting down router...");
        subscriber.stop().await;
        let report = pool.shutdown(grace).await;
        if let Some(task) = refresh {
            if let Err(e) = task.await {
                warn!(error = %e, "Periodic refresh task failed");
            }
        }
        if let Err(e) = subscriber.disconnect().await {
            warn!(error = %e, "Error while disconnecting from broker");
        }

        let stats = PipelineStats {
            ingestion: processor.normalizer().metrics().snapshot(),
            dispatch: dispatch_metrics.snapshot(),
            sensors_created: processor.resolver().created(),
            shutdown: report,
            duration: start_time.elapsed(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            processed = stats.dispatch.processed,
            stored = stats.dispatch.stored,
            "Router shutdown complete"
        );

        Ok(stats)
    }
}

/// Resolves once `max` messages have been processed; never when `None`
async fn wait_for_limit(metrics: &DispatchMetrics, max: Option<u64>) {
    let Some(max) = max else {
        return std::future::pending().await;
    };
    let mut ticker = tokio::time::interval(LIMIT_POLL);
    loop {
        ticker.tick().await;
        if metrics.processed() >= max {
            return;
        }
    }
}

async fn wait_for_timeout(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
