//! On-demand refresh requests
//!
//! Gateways answer `{"action": "refresh_all"}` on the request topic by
//! republishing their latest readings. No response correlation.

use std::time::Duration;

use contracts::RefreshConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::client::BrokerClient;
use crate::error::Result;

/// JSON body of a refresh request
pub fn refresh_payload(action: &str) -> Vec<u8> {
    serde_json::json!({ "action": action }).to_string().into_bytes()
}

/// Publish one refresh request
#[instrument(name = "request_refresh", skip(client, config), fields(topic = %config.topic))]
pub async fn request_refresh<C: BrokerClient>(client: &C, config: &RefreshConfig) -> Result<()> {
    client
        .publish(&config.topic, refresh_payload(&config.action))
        .await?;
    info!(action = %config.action, "Refresh requested");
    Ok(())
}

/// Publish a refresh request every `interval_secs` until `stop` flips.
///
/// Returns `None` when periodic refresh is disabled (`interval_secs == 0`).
pub fn spawn_periodic_refresh<C: BrokerClient>(
    client: C,
    config: RefreshConfig,
    mut stop: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    if config.interval_secs == 0 {
        return None;
    }
    let period = Duration::from_secs(config.interval_secs);
    let Some(first_tick) = tokio::time::Instant::now().checked_add(period) else {
        warn!(
            interval_secs = config.interval_secs,
            "Refresh interval out of range, periodic refresh disabled"
        );
        return None;
    };

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(first_tick, period);
        loop {
            tokio::select! {
                _ = stop.changed() => break,
                _ = ticker.tick() => {
                    if let Err(e) = request_refresh(&client, &config).await {
                        warn!(error = %e, "Periodic refresh failed");
                    }
                }
            }
        }
        debug!("Periodic refresh stopped");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::{MockBroker, MockConfig};

    #[test]
    fn test_payload_shape() {
        let body: serde_json::Value =
            serde_json::from_slice(&refresh_payload("refresh_all")).unwrap();
        assert_eq!(body, serde_json::json!({ "action": "refresh_all" }));
    }

    #[tokio::test]
    async fn test_request_refresh_publishes_on_topic() {
        let broker = MockBroker::new();
        let (client, _events) = broker.session();

        request_refresh(&client, &RefreshConfig::default()).await.unwrap();

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "wirepas/request/sensor-data");
        assert_eq!(published[0].1, br#"{"action":"refresh_all"}"#.to_vec());
    }

    #[tokio::test]
    async fn test_request_refresh_error_propagates() {
        let broker = MockBroker::with_config(MockConfig {
            fail_publish: true,
            ..Default::default()
        });
        let (client, _events) = broker.session();
        assert!(request_refresh(&client, &RefreshConfig::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_periodic_disabled() {
        let broker = MockBroker::new();
        let (client, _events) = broker.session();
        let (_tx, rx) = watch::channel(false);
        assert!(spawn_periodic_refresh(client, RefreshConfig::default(), rx).is_none());
    }

    #[tokio::test]
    async fn test_periodic_out_of_range_interval_disabled() {
        let broker = MockBroker::new();
        let (client, _events) = broker.session();
        let (_tx, rx) = watch::channel(false);
        let config = RefreshConfig {
            interval_secs: u64::MAX,
            ..Default::default()
        };
        assert!(spawn_periodic_refresh(client, config, rx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh_ticks_until_stopped() {
        let broker = MockBroker::new();
        let (client, _events) = broker.session();
        let (tx, rx) = watch::channel(false);
        let config = RefreshConfig {
            interval_secs: 10,
            ..Default::default()
        };

        let task = spawn_periodic_refresh(client, config, rx).unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;
        tx.send_replace(true);
        task.await.unwrap();

        assert_eq!(broker.published().len(), 2);
    }
}
