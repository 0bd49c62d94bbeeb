//! Message transport trait definition.
//!
//! The relay never talks to the network directly; it goes through a
//! [`Transport`], which a bot client implements. [`LoopbackTransport`] is an
//! in-memory implementation for local runs and tests.

use crate::core::SubscriberId;
use crate::relay::wire;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};

/// Failures reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport unreachable: {0}")]
    Unreachable(String),

    #[error("request rejected ({code}): {description}")]
    Rejected { code: i64, description: String },

    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport closed")]
    Closed,

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// A text message received from a subscriber endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat the message came from
    pub sender: SubscriberId,
    /// Message text
    pub text: String,
}

impl InboundMessage {
    pub fn new(sender: impl Into<SubscriberId>, text: &str) -> Self {
        Self {
            sender: sender.into(),
            text: text.to_string(),
        }
    }
}

/// Core trait for message transports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message to one subscriber.
    async fn send_message(&self, to: SubscriberId, text: &str) -> Result<(), TransportError>;

    /// Wait up to `timeout` for inbound messages.
    ///
    /// An empty vector means the wait elapsed without traffic.
    async fn poll_updates(&self, timeout: Duration) -> Result<Vec<InboundMessage>, TransportError>;
}

/// In-memory transport.
///
/// Inbound messages are queued with [`push_inbound`](Self::push_inbound);
/// outbound messages are recorded and can be inspected with
/// [`sent`](Self::sent).
#[derive(Default)]
pub struct LoopbackTransport {
    inbound: Mutex<VecDeque<InboundMessage>>,
    arrived: Notify,
    sent: Mutex<Vec<(SubscriberId, String)>>,
    failing: Mutex<HashSet<SubscriberId>>,
    stalled: Mutex<HashSet<SubscriberId>>,
    send_delay: Option<Duration>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every send, to exercise send timeouts.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Queue an inbound message and wake a pending poll.
    pub async fn push_inbound(&self, message: InboundMessage) {
        self.inbound.lock().await.push_back(message);
        self.arrived.notify_one();
    }

    /// Queue inbound messages from a Bot API `getUpdates` response body.
    ///
    /// Returns the number of text messages queued.
    pub async fn push_raw_updates(&self, body: &str) -> Result<usize, TransportError> {
        let updates = wire::parse_updates(body)?;
        let messages: Vec<_> = updates.into_iter().filter_map(wire::Update::into_inbound).collect();
        let count = messages.len();
        self.inbound.lock().await.extend(messages);
        if count > 0 {
            self.arrived.notify_one();
        }
        Ok(count)
    }

    /// Make every send to `id` fail as unreachable.
    pub async fn fail_for(&self, id: SubscriberId) {
        self.failing.lock().await.insert(id);
    }

    /// Make every send to `id` hang until the caller gives up.
    pub async fn stall_for(&self, id: SubscriberId) {
        self.stalled.lock().await.insert(id);
    }

    /// Let sends to `id` succeed again.
    pub async fn recover(&self, id: SubscriberId) {
        self.failing.lock().await.remove(&id);
    }

    /// All messages delivered so far, in send order.
    pub async fn sent(&self) -> Vec<(SubscriberId, String)> {
        self.sent.lock().await.clone()
    }

    /// Texts delivered to one subscriber.
    pub async fn sent_to(&self, id: SubscriberId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub async fn pending_inbound(&self) -> usize {
        self.inbound.lock().await.len()
    }

    async fn drain(&self) -> Vec<InboundMessage> {
        self.inbound.lock().await.drain(..).collect()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_message(&self, to: SubscriberId, text: &str) -> Result<(), TransportError> {
        let stalled = self.stalled.lock().await.contains(&to);
        if stalled {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().await.contains(&to) {
            return Err(TransportError::Unreachable(format!("chat {} unreachable", to)));
        }
        self.sent.lock().await.push((to, text.to_string()));
        Ok(())
    }

    async fn poll_updates(&self, timeout: Duration) -> Result<Vec<InboundMessage>, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ready = self.drain().await;
            if !ready.is_empty() {
                return Ok(ready);
            }
            // A push with no poller pending leaves a stored permit, so a wake
            // may find the queue already drained. Keep waiting until the deadline.
            if tokio::time::timeout_at(deadline, self.arrived.notified()).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }
}
