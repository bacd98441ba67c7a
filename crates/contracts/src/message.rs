//! InboundMessage - Transport output
//!
//! Raw (topic, payload) pair as delivered by the broker.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Message received from the broker, before routing
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Full topic the message was published on
    pub topic: String,

    /// Raw payload bytes (zero-copy)
    pub payload: Bytes,

    /// Wall-clock receipt time, the canonical measurement timestamp
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message stamped with the current time
    pub fn now(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }
}
