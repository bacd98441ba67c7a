//! MessageProcessor - one inbound message, end to end
//!
//! normalize → resolve identity → touch last-seen → append measurement.
//! Every failure comes back as a [`DispatchError`]; nothing is logged above
//! debug here, the worker pool owns reporting.

use std::sync::Arc;

use contracts::{IdentityPolicy, InboundMessage, ProtocolKind, SensorKey, SensorStore};
use ingestion::{Normalized, Normalizer, SkipReason};
use observability::MessageOutcome;
use tracing::{debug, warn};

use crate::error::{DispatchError, Result};
use crate::identity::IdentityResolver;
use crate::writer::{MeasurementWriter, WriteOutcome};

/// Successful result of processing one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Measurement persisted
    Stored { sensor_id: SensorKey },
    /// No persistable field; identity may still have been resolved
    Discarded { sensor_id: Option<SensorKey> },
    /// Recognised no-op message
    Skipped(SkipReason),
}

impl Outcome {
    /// Metrics outcome label
    pub fn label(&self) -> MessageOutcome {
        match self {
            Self::Stored { .. } => MessageOutcome::Stored,
            Self::Discarded { .. } => MessageOutcome::Discarded,
            Self::Skipped(_) => MessageOutcome::Skipped,
        }
    }
}

/// Processing result tagged with the message's protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processed {
    pub protocol: ProtocolKind,
    pub outcome: Outcome,
}

/// Processes inbound messages against a SensorStore
pub struct MessageProcessor<S> {
    normalizer: Normalizer,
    resolver: IdentityResolver<S>,
    writer: MeasurementWriter<S>,
    store: Arc<S>,
    policy: IdentityPolicy,
}

impl<S: SensorStore> MessageProcessor<S> {
    pub fn new(store: Arc<S>, policy: IdentityPolicy) -> Self {
        Self {
            normalizer: Normalizer::new(),
            resolver: IdentityResolver::new(Arc::clone(&store)),
            writer: MeasurementWriter::new(Arc::clone(&store)),
            store,
            policy,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn resolver(&self) -> &IdentityResolver<S> {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Process one message
    pub async fn process(&self, message: &InboundMessage) -> Result<Processed> {
        let reading = match self.normalizer.normalize(message)? {
            Normalized::Reading(reading) => reading,
            Normalized::Skipped { protocol, reason } => {
                return Ok(Processed {
                    protocol,
                    outcome: Outcome::Skipped(reason),
                });
            }
        };
        let protocol = reading.protocol;

        if !reading.fields.has_environmental() && !self.policy.create_without_fields {
            debug!(address = %reading.address, "No persistable field, identity not created");
            return Ok(Processed {
                protocol,
                outcome: Outcome::Discarded { sensor_id: None },
            });
        }

        let identity = self
            .resolver
            .resolve(&reading.address)
            .await
            .map_err(|e| DispatchError::persistence(protocol, reading.address.clone(), e))?;

        // last-seen is informational, a failed touch does not drop the reading
        if let Err(e) = self.store.touch_sensor(identity.id, message.received_at).await {
            warn!(sensor_id = identity.id, error = %e, "Failed to update last_seen");
        }

        let written = self
            .writer
            .append(identity.id, &reading.fields, message.received_at)
            .await
            .map_err(|e| DispatchError::persistence(protocol, reading.address.clone(), e))?;

        let outcome = match written {
            WriteOutcome::Stored => Outcome::Stored {
                sensor_id: identity.id,
            },
            WriteOutcome::Discarded => Outcome::Discarded {
                sensor_id: Some(identity.id),
            },
        };
        Ok(Processed { protocol, outcome })
    }
}
