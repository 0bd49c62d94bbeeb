//! Broadcast relay.
//!
//! Fans training progress out to every registered subscriber and runs a
//! background listener that applies inbound subscribe/unsubscribe commands.
//!
//! ## Lifecycle
//! ```text
//! new() ──► Constructed ──start()──► Listening ──shutdown()──► Stopped
//!                                       │
//!                                    close()  (clears subscribers, keeps listening)
//! ```

use crate::core::{Error, ObserverConfig, RelaySettings, Result, SubscriberId};
use crate::relay::command::CommandRouter;
use crate::relay::registry::SubscriberRegistry;
use crate::relay::transport::{Transport, TransportError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of a single broadcast.
#[derive(Clone, Debug, Default)]
pub struct DeliveryReport {
    /// Subscribers that received the message
    pub delivered: Vec<SubscriberId>,
    /// Subscribers whose delivery failed, with the reason
    pub failed: Vec<(SubscriberId, TransportError)>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// Every attempted delivery succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Subscribers existed but none was reached.
    pub fn all_failed(&self) -> bool {
        self.delivered.is_empty() && !self.failed.is_empty()
    }
}

/// Relay streaming messages to a dynamic set of subscribers.
///
/// Construction is side-effect free; [`start`](Self::start) seeds the
/// default subscriber, sends the startup notice and spawns the listener.
pub struct BroadcastRelay {
    registry: Arc<SubscriberRegistry>,
    transport: Arc<dyn Transport>,
    default_subscriber: SubscriberId,
    settings: RelaySettings,
    cancel: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastRelay {
    /// Create a relay. Nothing is sent and no task is spawned.
    pub fn new(
        transport: Arc<dyn Transport>,
        default_subscriber: SubscriberId,
        settings: RelaySettings,
    ) -> Self {
        Self {
            registry: Arc::new(SubscriberRegistry::new()),
            transport,
            default_subscriber,
            settings,
            cancel: CancellationToken::new(),
            listener: Mutex::new(None),
        }
    }

    /// Create a relay from observer configuration.
    ///
    /// Fails when no transport credentials are configured.
    pub fn from_config(config: &ObserverConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let credentials = config.credentials()?;
        if let Some(proxy) = config.proxy_url() {
            debug!(%proxy, "relay transport routed through proxy");
        }
        Ok(Self::new(
            transport,
            credentials.default_chat_id,
            config.relay.clone(),
        ))
    }

    /// Shared subscriber registry.
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn default_subscriber(&self) -> SubscriberId {
        self.default_subscriber
    }

    /// Current subscribers.
    pub async fn subscribers(&self) -> HashSet<SubscriberId> {
        self.registry.snapshot().await
    }

    /// Seed the default subscriber, broadcast `startup_notice` and spawn
    /// the command listener.
    pub async fn start(&self, startup_notice: &str) -> Result<DeliveryReport> {
        let mut listener = self.listener.lock().await;
        if self.cancel.is_cancelled() {
            return Err(Error::RelayShutDown);
        }
        if listener.is_some() {
            return Err(Error::RelayAlreadyStarted);
        }

        self.registry.add(self.default_subscriber).await;
        let report = self.log(startup_notice).await;

        let router = CommandRouter::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.transport),
            self.settings.send_timeout(),
        );
        *listener = Some(tokio::spawn(listen(
            router,
            Arc::clone(&self.transport),
            self.settings.poll_timeout(),
            self.settings.poll_backoff(),
            self.cancel.clone(),
        )));

        info!(default_subscriber = %self.default_subscriber, "broadcast relay started");
        Ok(report)
    }

    /// Send `message` to every current subscriber.
    ///
    /// Sends run concurrently, each bounded by the configured send timeout
    /// and attempted once. Failures are logged and reported, never raised.
    pub async fn log(&self, message: &str) -> DeliveryReport {
        let subscribers = self.registry.snapshot().await;
        let timeout = self.settings.send_timeout();

        let sends = subscribers.into_iter().map(|id| {
            let transport = Arc::clone(&self.transport);
            async move {
                let result = match tokio::time::timeout(timeout, transport.send_message(id, message)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(timeout)),
                };
                (id, result)
            }
        });

        let mut report = DeliveryReport::default();
        for (id, result) in futures::future::join_all(sends).await {
            match result {
                Ok(()) => report.delivered.push(id),
                Err(error) => {
                    warn!(subscriber = %id, %error, text = message, "broadcast delivery failed");
                    report.failed.push((id, error));
                }
            }
        }
        debug!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "broadcast finished"
        );
        report
    }

    /// Stop broadcasting to everyone. The listener keeps running, so
    /// subscribers can opt back in.
    pub async fn close(&self) {
        self.registry.clear().await;
        info!("broadcast relay closed, subscribers cleared");
    }

    /// Cancel the listener and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.listener.lock().await.take();
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                warn!(%error, "relay listener terminated abnormally");
            }
        }
        info!("broadcast relay shut down");
    }

    /// Whether the listener task is running.
    pub async fn is_listening(&self) -> bool {
        match self.listener.lock().await.as_ref() {
            Some(handle) => !handle.is_finished(),
            None => false,
        }
    }
}

async fn listen(
    router: CommandRouter,
    transport: Arc<dyn Transport>,
    poll_timeout: Duration,
    poll_backoff: Duration,
    cancel: CancellationToken,
) {
    debug!("relay listener running");
    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            polled = transport.poll_updates(poll_timeout) => polled,
        };

        match polled {
            Ok(messages) => {
                let dispatch = async {
                    for message in &messages {
                        router.handle(message).await;
                    }
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = dispatch => {}
                }
            }
            Err(TransportError::Closed) => {
                warn!("transport closed, relay listener exiting");
                break;
            }
            Err(error) => {
                warn!(%error, "polling for commands failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_backoff) => {}
                }
            }
        }
    }
    debug!("relay listener stopped");
}
