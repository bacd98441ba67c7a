//! rumqttc-backed broker session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::BrokerConfig;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::instrument;

use crate::client::{BrokerClient, BrokerEvents, SessionEvent};
use crate::error::{Result, TransportError};

/// Request side of an MQTT session
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
    closed: Arc<AtomicBool>,
}

/// Event side of an MQTT session
pub struct MqttEvents {
    eventloop: EventLoop,
}

/// Create an MQTT session for `config`.
///
/// Nothing is sent until [`MqttEvents`] is polled. `min_requests` bounds the
/// request queue from below so that queued subscriptions never block the
/// task that drives the event loop.
#[instrument(
    name = "mqtt_session",
    skip(config),
    fields(address = %config.address(), client_id = %config.client_id)
)]
pub fn mqtt_session(config: &BrokerConfig, min_requests: usize) -> (MqttClient, MqttEvents) {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    options.set_clean_session(true);
    if let Some((user, pass)) = config.credentials() {
        options.set_credentials(user, pass);
    }

    let capacity = config.request_capacity.max(min_requests);
    let (client, eventloop) = AsyncClient::new(options, capacity);
    (
        MqttClient {
            client,
            closed: Arc::new(AtomicBool::new(false)),
        },
        MqttEvents { eventloop },
    )
}

impl BrokerClient for MqttClient {
    async fn subscribe(&self, filter: &str) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .map_err(|e| TransportError::subscribe(filter, e.to_string()))
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| TransportError::publish(topic, e.to_string()))
    }

    async fn disconnect(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // the event loop may already be gone; nothing left to release then
        let _ = self.client.disconnect().await;
        Ok(())
    }
}

impl BrokerEvents for MqttEvents {
    async fn poll(&mut self) -> Result<SessionEvent> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => Ok(SessionEvent::ConnAck),
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(SessionEvent::Message {
                topic: publish.topic,
                payload: publish.payload,
            }),
            Ok(_) => Ok(SessionEvent::Other),
            Err(e) => Err(TransportError::connection(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (client, _events) = mqtt_session(&BrokerConfig::default(), 8);
        assert!(client.disconnect().await.is_ok());
        assert!(client.disconnect().await.is_ok());
        assert!(matches!(
            client.publish("a/b", b"x".to_vec()).await,
            Err(TransportError::Closed)
        ));
    }
}
