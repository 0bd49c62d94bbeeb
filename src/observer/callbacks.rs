//! Training observers for the checkpoint shadow and the broadcast relay.

use crate::core::{MetricsSnapshot, ObserverConfig, Result};
use crate::observer::epoch::EpochObserver;
use crate::relay::{BroadcastRelay, DeliveryReport};
use crate::shadow::CheckpointShadow;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Metrics included in the per-epoch broadcast.
pub const REPORTED_METRICS: [&str; 3] = ["loss", "regression_loss", "classification_loss"];

/// Shadows feed state at every epoch end. Errors propagate.
pub struct ShadowObserver {
    shadow: CheckpointShadow,
}

impl ShadowObserver {
    pub fn new(shadow: CheckpointShadow) -> Self {
        Self { shadow }
    }

    pub fn from_config(config: &ObserverConfig) -> Self {
        Self::new(CheckpointShadow::from_config(config))
    }

    pub fn shadow(&self) -> &CheckpointShadow {
        &self.shadow
    }
}

#[async_trait]
impl EpochObserver for ShadowObserver {
    async fn on_epoch_end(&self, epoch: usize, _metrics: &MetricsSnapshot) -> Result<()> {
        self.shadow.on_epoch_end(epoch)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "checkpoint_shadow"
    }
}

/// Broadcasts per-epoch losses through a relay.
///
/// Broadcasting never fails the epoch: delivery problems are logged locally.
pub struct BroadcastObserver {
    model_name: String,
    relay: Arc<BroadcastRelay>,
}

impl BroadcastObserver {
    pub fn new(model_name: &str, relay: Arc<BroadcastRelay>) -> Self {
        Self {
            model_name: model_name.to_string(),
            relay,
        }
    }

    pub fn relay(&self) -> &Arc<BroadcastRelay> {
        &self.relay
    }

    /// Start the relay with the training-started notice.
    pub async fn start(&self) -> Result<DeliveryReport> {
        self.relay.start(&startup_notice(&self.model_name)).await
    }
}

#[async_trait]
impl EpochObserver for BroadcastObserver {
    async fn on_epoch_end(&self, epoch: usize, metrics: &MetricsSnapshot) -> Result<()> {
        let report = self.relay.log(&epoch_summary(&self.model_name, metrics)).await;
        if report.all_failed() {
            warn!(epoch, failed = report.failed.len(), "no response from relay");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "broadcast"
    }
}

/// Notice sent when training starts.
pub fn startup_notice(model_name: &str) -> String {
    format!("{} model training started.", model_name)
}

/// Per-epoch metrics message.
pub fn epoch_summary(model_name: &str, metrics: &MetricsSnapshot) -> String {
    let [loss, regression, classification] = REPORTED_METRICS.map(|name| metrics.display(name));
    format!(
        "Model: {}:\n loss: {};\n regression_loss: {};\n classification_loss: {}",
        model_name, loss, regression, classification
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RelaySettings, SubscriberId};
    use crate::observer::epoch::ObserverChain;
    use crate::relay::LoopbackTransport;
    use crate::shadow::FeedStateStore;
    use std::fs;

    fn relay(transport: Arc<LoopbackTransport>) -> Arc<BroadcastRelay> {
        let settings = RelaySettings {
            send_timeout_ms: 200,
            poll_timeout_secs: 1,
            poll_backoff_ms: 10,
        };
        Arc::new(BroadcastRelay::new(transport, SubscriberId(1), settings))
    }

    #[test]
    fn test_epoch_summary_format() {
        let metrics = MetricsSnapshot::new()
            .with_metric("loss", 1.5)
            .with_metric("regression_loss", 1.25)
            .with_metric("classification_loss", 0.25);
        assert_eq!(
            epoch_summary("resnet50", &metrics),
            "Model: resnet50:\n loss: 1.5;\n regression_loss: 1.25;\n classification_loss: 0.25"
        );
    }

    #[test]
    fn test_epoch_summary_missing_metric() {
        let metrics = MetricsSnapshot::new().with_metric("loss", 2.0);
        let text = epoch_summary("resnet50", &metrics);
        assert!(text.contains("loss: 2;"));
        assert!(text.contains("regression_loss: n/a;"));
    }

    #[test]
    fn test_startup_notice() {
        assert_eq!(startup_notice("resnet50"), "resnet50 model training started.");
    }

    #[tokio::test]
    async fn test_broadcast_observer_sends_summary() {
        let transport = Arc::new(LoopbackTransport::new());
        let observer = BroadcastObserver::new("resnet50", relay(transport.clone()));
        observer.start().await.unwrap();

        let metrics = MetricsSnapshot::new().with_metric("loss", 0.5);
        observer.on_epoch_end(0, &metrics).await.unwrap();

        let sent = transport.sent_to(SubscriberId(1)).await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], "resnet50 model training started.");
        assert!(sent[1].starts_with("Model: resnet50:\n loss: 0.5;"));

        observer.relay().shutdown().await;
    }

    #[tokio::test]
    async fn test_broadcast_observer_swallows_failures() {
        let transport = Arc::new(LoopbackTransport::new());
        transport.fail_for(SubscriberId(1)).await;
        let observer = BroadcastObserver::new("resnet50", relay(transport.clone()));
        observer.start().await.unwrap();

        assert!(observer.on_epoch_end(3, &MetricsSnapshot::new()).await.is_ok());
        assert!(transport.sent().await.is_empty());

        observer.relay().shutdown().await;
    }

    #[tokio::test]
    async fn test_shadow_observer_propagates_io_errors() {
        let dir = std::env::temp_dir().join(format!("trainwatch-observer-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let store = FeedStateStore::new(&dir);
        store.write_groups(b"plan").unwrap();
        fs::write(store.group_index_path(), b"?").unwrap();

        let observer = ShadowObserver::new(CheckpointShadow::new(Some(dir.clone()), 10));
        assert!(observer.on_epoch_end(0, &MetricsSnapshot::new()).await.is_err());

        fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_full_epoch_chain() {
        let dir = std::env::temp_dir().join(format!("trainwatch-chain-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let store = FeedStateStore::new(&dir);

        let config = ObserverConfig::default().with_restore_path(&dir);
        let transport = Arc::new(LoopbackTransport::new());
        let broadcast = Arc::new(BroadcastObserver::new("retinanet", relay(transport.clone())));
        broadcast.start().await.unwrap();

        let chain = ObserverChain::new()
            .with(Arc::new(ShadowObserver::from_config(&config)))
            .with(broadcast.clone());

        // Before the feed persists anything the shadow is skipped.
        chain.on_epoch_end(0, &MetricsSnapshot::new()).await.unwrap();
        assert!(!store.has_shadow_state().unwrap());

        store.write_groups(b"groups-v1").unwrap();
        store.write_group_index(37).unwrap();
        let metrics = MetricsSnapshot::new().with_metric("loss", 0.75);
        chain.on_epoch_end(1, &metrics).await.unwrap();

        let shadow = store.read_shadow().unwrap().unwrap();
        assert_eq!(shadow.group_index, 27);
        assert_eq!(shadow.groups, b"groups-v1".to_vec());
        assert_eq!(transport.sent_to(SubscriberId(1)).await.len(), 3);

        broadcast.relay().shutdown().await;
        fs::remove_dir_all(dir).unwrap();
    }
}
