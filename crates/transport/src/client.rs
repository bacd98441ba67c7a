//! Broker client abstraction
//!
//! A broker session is split in two halves, as MQTT clients usually are:
//! a cloneable request side ([`BrokerClient`]) and an event stream
//! ([`BrokerEvents`]) that must be polled to drive the connection.
//! Real and mock brokers implement the same pair.

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

/// One event observed on the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Broker acknowledged a (re)connection
    ConnAck,
    /// Application message on a subscribed topic
    Message { topic: String, payload: Bytes },
    /// Any other protocol traffic (pings, acks)
    Other,
}

/// Request side of a broker session
pub trait BrokerClient: Clone + Send + Sync + 'static {
    /// Subscribe to a topic filter
    fn subscribe(&self, filter: &str) -> impl Future<Output = Result<()>> + Send;

    /// Publish a message, fire-and-forget
    fn publish(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Close the session
    ///
    /// Idempotent: returns Ok if already closed
    fn disconnect(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Event side of a broker session
pub trait BrokerEvents: Send + 'static {
    /// Wait for the next event
    ///
    /// An error means the connection was lost; polling again attempts to
    /// reconnect.
    fn poll(&mut self) -> impl Future<Output = Result<SessionEvent>> + Send;
}
