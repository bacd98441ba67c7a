//! # Transport
//!
//! Publish/subscribe transport for the router.
//!
//! Responsibilities:
//! - Connect to the broker with a bounded timeout and retries
//! - Subscribe to the configured topic filters, again after every reconnect
//! - Forward `(topic, payload, received_at)` into the bounded worker queue
//! - Publish refresh requests
//!
//! ## Feature Flags
//!
//! - `mqtt`: rumqttc-backed client (default)

pub mod client;
pub mod error;
pub mod mock_client;
pub mod refresh;
pub mod state;
pub mod subscriber;

#[cfg(feature = "mqtt")]
pub mod mqtt_client;

pub use client::{BrokerClient, BrokerEvents, SessionEvent};
pub use error::{Result, TransportError};
pub use mock_client::{MockBroker, MockClient, MockConfig, MockEvents};
pub use refresh::{refresh_payload, request_refresh, spawn_periodic_refresh};
pub use state::{Backoff, ConnectionState};
pub use subscriber::{Subscriber, SubscriberHandle, SubscriberOptions};

#[cfg(feature = "mqtt")]
pub use mqtt_client::{mqtt_session, MqttClient, MqttEvents};
