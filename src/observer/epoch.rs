//! Epoch observer trait definition.
//!
//! The training loop calls every registered observer once per completed
//! epoch, after the model checkpoint for that epoch has been written.

use crate::core::{MetricsSnapshot, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Hook invoked by the training loop at epoch boundaries.
#[async_trait]
pub trait EpochObserver: Send + Sync {
    /// Called once per completed epoch.
    async fn on_epoch_end(&self, epoch: usize, metrics: &MetricsSnapshot) -> Result<()>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Observers run in registration order.
///
/// Register checkpoint-dependent observers after the checkpoint writer so
/// they see the state written for the same epoch.
#[derive(Default)]
pub struct ObserverChain {
    observers: Vec<Arc<dyn EpochObserver>>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer.
    pub fn with(mut self, observer: Arc<dyn EpochObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: Arc<dyn EpochObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Run every observer for `epoch`, stopping at the first error.
    pub async fn on_epoch_end(&self, epoch: usize, metrics: &MetricsSnapshot) -> Result<()> {
        for observer in &self.observers {
            observer.on_epoch_end(epoch, metrics).await.map_err(|e| {
                tracing::error!(epoch, observer = observer.name(), error = %e, "epoch observer failed");
                e
            })?;
        }
        Ok(())
    }
}
