//! Transport Subscriber
//!
//! Owns the connection lifecycle: initial connect with a bounded timeout and
//! retries, subscription to the configured topic filters, forwarding of
//! inbound messages into the worker queue, and automatic resubscription
//! after a reconnect. Messages published while disconnected are lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{InboundMessage, IngestConfig};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{BrokerClient, BrokerEvents, SessionEvent};
use crate::error::{Result, TransportError};
use crate::state::{Backoff, ConnectionState};

/// Bound on flushing the session after a disconnect request
const FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct SubscriberOptions {
    /// Broker address (for logs and errors)
    pub address: String,
    /// Topic filters subscribed on every (re)connection
    pub topics: Vec<String>,
    /// Bound on a single connect attempt
    pub connect_timeout: Duration,
    /// Initial connect attempts (0 = retry forever)
    pub connect_attempts: u32,
    /// Reconnect / retry backoff
    pub backoff: Backoff,
}

impl SubscriberOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            address: config.broker.address(),
            topics: config.topics.iter().cloned().collect(),
            connect_timeout: Duration::from_secs(config.broker.connect_timeout_secs),
            connect_attempts: config.broker.connect_attempts,
            backoff: Backoff::from_config(&config.broker.reconnect),
        }
    }
}

/// Connects a broker session and spawns the read loop
pub struct Subscriber;

impl Subscriber {
    /// Connect, subscribe and start forwarding messages into `queue`.
    ///
    /// Fails with [`TransportError::ConnectFailed`] or
    /// [`TransportError::ConnectTimeout`] once every attempt is exhausted.
    #[instrument(
        name = "subscriber_connect",
        skip_all,
        fields(address = %options.address, topics = options.topics.len())
    )]
    pub async fn connect<C, E>(
        client: C,
        mut events: E,
        mut options: SubscriberOptions,
        queue: async_channel::Sender<InboundMessage>,
    ) -> Result<SubscriberHandle<C, E>>
    where
        C: BrokerClient,
        E: BrokerEvents,
    {
        let state = Arc::new(watch::channel(ConnectionState::Disconnected).0);
        set_state(&state, ConnectionState::Connecting);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match await_connack(&mut events, &options).await {
                Ok(()) => break,
                Err(e) => {
                    let exhausted =
                        options.connect_attempts != 0 && attempt >= options.connect_attempts;
                    if exhausted {
                        error!(attempt, error = %e, "Giving up connecting to broker");
                        set_state(&state, ConnectionState::Disconnected);
                        return Err(e);
                    }
                    let delay = options.backoff.next_delay();
                    warn!(
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Connect attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        options.backoff.reset();

        for topic in &options.topics {
            if let Err(e) = client.subscribe(topic).await {
                set_state(&state, ConnectionState::Disconnected);
                return Err(e);
            }
        }
        set_state(&state, ConnectionState::Connected);
        info!(attempt, "Connected and subscribed");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(session_loop(
            client.clone(),
            events,
            options.clone(),
            queue,
            Arc::clone(&state),
            shutdown_rx,
        ));

        Ok(SubscriberHandle {
            client,
            address: options.address,
            state,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
            events: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }
}

/// Handle to a running subscriber
pub struct SubscriberHandle<C, E> {
    client: C,
    address: String,
    state: Arc<watch::Sender<ConnectionState>>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<E>>>,
    events: Mutex<Option<E>>,
    closed: AtomicBool,
}

impl<C, E> SubscriberHandle<C, E>
where
    C: BrokerClient,
    E: BrokerEvents,
{
    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Flips to `true` when the subscriber is asked to stop
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Request side of the session (for refresh publishing)
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Publish a message, fire-and-forget
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::InvalidState(
                "publish after disconnect".into(),
            ));
        }
        self.client.publish(topic, payload).await
    }

    /// Stop forwarding inbound messages.
    ///
    /// Drops the queue sender so workers drain and exit; the connection
    /// itself stays open until [`disconnect`](Self::disconnect).
    #[instrument(name = "subscriber_stop", skip(self), fields(address = %self.address))]
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            match task.await {
                Ok(events) => *self.events.lock().await = Some(events),
                Err(e) => error!(error = %e, "Subscriber task failed"),
            }
        }
    }

    /// Stop the read loop and release the connection.
    ///
    /// Safe to call multiple times.
    #[instrument(name = "subscriber_disconnect", skip(self), fields(address = %self.address))]
    pub async fn disconnect(&self) -> Result<()> {
        self.stop().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let result = self.client.disconnect().await;
        if let Some(mut events) = self.events.lock().await.take() {
            // drive the session until the disconnect is flushed
            let _ = tokio::time::timeout(FLUSH_TIMEOUT, async move {
                while events.poll().await.is_ok() {}
            })
            .await;
        }
        set_state(&self.state, ConnectionState::Disconnected);
        info!("Disconnected from broker");
        result
    }
}

/// Poll until the broker acknowledges the connection, bounded by the timeout
async fn await_connack<E: BrokerEvents>(events: &mut E, options: &SubscriberOptions) -> Result<()> {
    let wait = async {
        loop {
            if let SessionEvent::ConnAck = events.poll().await? {
                return Ok::<(), TransportError>(());
            }
        }
    };

    match tokio::time::timeout(options.connect_timeout, wait).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TransportError::ConnectFailed {
            address: options.address.clone(),
            message: e.to_string(),
        }),
        Err(_) => Err(TransportError::ConnectTimeout {
            address: options.address.clone(),
            timeout_secs: options.connect_timeout.as_secs(),
        }),
    }
}

/// Read loop: forwards messages and handles reconnects until stopped
#[instrument(name = "subscriber_loop", skip_all, fields(address = %options.address))]
async fn session_loop<C, E>(
    client: C,
    mut events: E,
    mut options: SubscriberOptions,
    queue: async_channel::Sender<InboundMessage>,
    state: Arc<watch::Sender<ConnectionState>>,
    mut shutdown: watch::Receiver<bool>,
) -> E
where
    C: BrokerClient,
    E: BrokerEvents,
{
    debug!("Subscriber loop started");

    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            event = events.poll() => event,
        };

        match event {
            Ok(SessionEvent::Message { topic, payload }) => {
                let message = InboundMessage::now(topic, payload);
                // bounded queue: blocks here when the workers fall behind
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    sent = queue.send(message) => {
                        if sent.is_err() {
                            warn!("Worker queue closed, stopping subscriber");
                            break;
                        }
                    }
                }
                observability::metrics::record_queue_depth(queue.len());
            }
            Ok(SessionEvent::ConnAck) => {
                let reconnecting = *state.borrow() == ConnectionState::Reconnecting;
                if reconnecting {
                    for topic in &options.topics {
                        if let Err(e) = client.subscribe(topic).await {
                            error!(topic = %topic, error = %e, "Resubscribe failed");
                        }
                    }
                    options.backoff.reset();
                    set_state(&state, ConnectionState::Connected);
                    observability::metrics::record_reconnect();
                    info!(topics = options.topics.len(), "Reconnected and resubscribed");
                }
            }
            Ok(SessionEvent::Other) => {}
            Err(TransportError::Closed) => {
                debug!("Session closed");
                break;
            }
            Err(e) => {
                let was_connected = *state.borrow() != ConnectionState::Reconnecting;
                if was_connected {
                    warn!(error = %e, "Connection lost, reconnecting");
                    set_state(&state, ConnectionState::Reconnecting);
                } else {
                    debug!(error = %e, "Reconnect attempt failed");
                }
                let delay = options.backoff.next_delay();
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    debug!("Subscriber loop stopped");
    events
}

fn set_state(state: &watch::Sender<ConnectionState>, next: ConnectionState) {
    let previous = state.send_replace(next);
    if previous != next {
        debug!(from = %previous, to = %next, "Connection state changed");
    }
    observability::metrics::record_connection_state(next.as_code());
}
