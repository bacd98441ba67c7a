//! In-process mock broker
//!
//! Used by unit and end-to-end tests. Messages and connection drops are
//! scripted through [`MockBroker`]; subscriptions and publishes are recorded.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::instrument;

use crate::client::{BrokerClient, BrokerEvents, SessionEvent};
use crate::error::{Result, TransportError};

/// Mock broker behaviour
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Number of connection attempts refused before one succeeds
    pub refuse_connects: u32,
    /// Never acknowledge a connection (exercises the connect timeout)
    pub never_ack: bool,
    /// Reject every subscribe request
    pub fail_subscribe: bool,
    /// Reject every publish request
    pub fail_publish: bool,
}

enum Scripted {
    Message { topic: String, payload: Bytes },
    Drop,
}

struct MockInner {
    config: MockConfig,
    script_tx: async_channel::Sender<Scripted>,
    script_rx: async_channel::Receiver<Scripted>,
    refused: AtomicU32,
    connects: AtomicU32,
    subscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    closed: AtomicBool,
}

/// Mock broker
#[derive(Clone)]
pub struct MockBroker {
    inner: Arc<MockInner>,
}

impl MockBroker {
    /// Broker that accepts every connection
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        let (script_tx, script_rx) = async_channel::unbounded();
        Self {
            inner: Arc::new(MockInner {
                config,
                script_tx,
                script_rx,
                refused: AtomicU32::new(0),
                connects: AtomicU32::new(0),
                subscriptions: Mutex::new(Vec::new()),
                published: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Open a session against this broker
    pub fn session(&self) -> (MockClient, MockEvents) {
        (
            MockClient {
                inner: Arc::clone(&self.inner),
            },
            MockEvents {
                inner: Arc::clone(&self.inner),
                connected: false,
            },
        )
    }

    /// Deliver a message to the session
    pub fn inject(&self, topic: impl Into<String>, payload: impl Into<Bytes>) {
        let _ = self.inner.script_tx.try_send(Scripted::Message {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    /// Drop the connection; the session reconnects on its next poll
    pub fn drop_connection(&self) {
        let _ = self.inner.script_tx.try_send(Scripted::Drop);
    }

    /// Every subscribe request seen, in order (resubscriptions included)
    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.inner.subscriptions).clone()
    }

    /// Every publish request seen, in order
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.inner.published).clone()
    }

    /// Number of acknowledged connections (initial + reconnects)
    pub fn connect_count(&self) -> u32 {
        self.inner.connects.load(Ordering::Relaxed)
    }

    /// Scripted events not yet consumed
    pub fn pending(&self) -> usize {
        self.inner.script_rx.len()
    }

    /// Whether the client disconnected
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Request side of a mock session
#[derive(Clone)]
pub struct MockClient {
    inner: Arc<MockInner>,
}

impl BrokerClient for MockClient {
    #[instrument(name = "mock_broker_subscribe", skip(self))]
    async fn subscribe(&self, filter: &str) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        if self.inner.config.fail_subscribe {
            return Err(TransportError::subscribe(filter, "mock failure"));
        }
        lock(&self.inner.subscriptions).push(filter.to_string());
        Ok(())
    }

    #[instrument(name = "mock_broker_publish", skip(self, payload))]
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        if self.inner.config.fail_publish {
            return Err(TransportError::publish(topic, "mock failure"));
        }
        lock(&self.inner.published).push((topic.to_string(), payload));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        // idempotent: a second call finds the channel already closed
        self.inner.closed.store(true, Ordering::Release);
        self.inner.script_tx.close();
        Ok(())
    }
}

/// Event side of a mock session
pub struct MockEvents {
    inner: Arc<MockInner>,
    connected: bool,
}

impl BrokerEvents for MockEvents {
    async fn poll(&mut self) -> Result<SessionEvent> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        if !self.connected {
            if self.inner.refused.load(Ordering::Relaxed) < self.inner.config.refuse_connects {
                self.inner.refused.fetch_add(1, Ordering::Relaxed);
                return Err(TransportError::connection("connection refused"));
            }
            if self.inner.config.never_ack {
                std::future::pending::<()>().await;
            }
            self.connected = true;
            self.inner.connects.fetch_add(1, Ordering::Relaxed);
            return Ok(SessionEvent::ConnAck);
        }

        match self.inner.script_rx.recv().await {
            Ok(Scripted::Message { topic, payload }) => {
                Ok(SessionEvent::Message { topic, payload })
            }
            Ok(Scripted::Drop) => {
                self.connected = false;
                Err(TransportError::connection("connection reset by mock broker"))
            }
            Err(_) => Err(TransportError::Closed),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_poll_acknowledges() {
        let broker = MockBroker::new();
        let (_client, mut events) = broker.session();
        assert_eq!(events.poll().await.unwrap(), SessionEvent::ConnAck);
        assert_eq!(broker.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_message_is_delivered() {
        let broker = MockBroker::new();
        let (_client, mut events) = broker.session();
        events.poll().await.unwrap();

        broker.inject("sensor/abc/data", "{}");
        assert_eq!(
            events.poll().await.unwrap(),
            SessionEvent::Message {
                topic: "sensor/abc/data".into(),
                payload: Bytes::from_static(b"{}"),
            }
        );
    }

    #[tokio::test]
    async fn test_drop_then_reconnect() {
        let broker = MockBroker::new();
        let (_client, mut events) = broker.session();
        events.poll().await.unwrap();

        broker.drop_connection();
        assert!(events.poll().await.is_err());
        assert_eq!(events.poll().await.unwrap(), SessionEvent::ConnAck);
        assert_eq!(broker.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_refused_connects() {
        let broker = MockBroker::with_config(MockConfig {
            refuse_connects: 2,
            ..Default::default()
        });
        let (_client, mut events) = broker.session();
        assert!(events.poll().await.is_err());
        assert!(events.poll().await.is_err());
        assert_eq!(events.poll().await.unwrap(), SessionEvent::ConnAck);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let broker = MockBroker::new();
        let (client, _events) = broker.session();
        client.subscribe("a/+").await.unwrap();
        client.publish("b", b"x".to_vec()).await.unwrap();
        assert_eq!(broker.subscriptions(), vec!["a/+".to_string()]);
        assert_eq!(broker.published(), vec![("b".to_string(), b"x".to_vec())]);
    }

    #[tokio::test]
    async fn test_disconnect_closes_session() {
        let broker = MockBroker::new();
        let (client, mut events) = broker.session();
        events.poll().await.unwrap();

        client.disconnect().await.unwrap();
        client.disconnect().await.unwrap();
        assert!(broker.is_closed());
        assert!(matches!(events.poll().await, Err(TransportError::Closed)));
        assert!(client.publish("b", Vec::new()).await.is_err());
    }
}
