//! `refresh` command implementation.

use anyhow::{Context, Result};
use contracts::StoreKind;
use tracing::info;
use transport::{Subscriber, SubscriberOptions};

use super::source::load_config;
use crate::cli::RefreshArgs;
use crate::error::CliError;

/// Execute the `refresh` command: connect, publish one request, disconnect
pub async fn run_refresh(args: &RefreshArgs) -> Result<()> {
    // the store is never opened here
    let config = load_config(&args.source, |config| {
        config.store.kind = StoreKind::Memory;
    })?;

    let (client, events) = transport::mqtt_session(&config.broker, 2);
    let mut options = SubscriberOptions::from_config(&config);
    options.topics.clear();

    // nothing is subscribed, the queue only keeps the session loop running
    let (queue_tx, _queue_rx) = async_channel::bounded(1);
    let session = Subscriber::connect(client, events, options, queue_tx)
        .await
        .map_err(|e| CliError::broker_connection(config.broker.address(), e.to_string()))?;

    let published = transport::request_refresh(session.client(), &config.refresh)
        .await
        .context("Failed to publish refresh request");
    session
        .disconnect()
        .await
        .context("Failed to disconnect from broker")?;
    published?;

    info!(topic = %config.refresh.topic, "Refresh request sent");
    println!(
        "Refresh request '{}' published on {}",
        config.refresh.action, config.refresh.topic
    );
    Ok(())
}
