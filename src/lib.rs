//! # trainwatch - Training Loop Observers
//!
//! Epoch-boundary observers for a model training loop:
//! - **Shadow**: checkpoint-aligned copies of a data feed's persisted position,
//!   corrected for the feed's prefetch lookahead
//! - **Relay**: best-effort broadcast of epoch metrics to subscribers that opt
//!   in and out with `start` / `stop` commands
//! - **Observer**: the trait the training loop drives, with ready-made
//!   observers for both
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trainwatch::core::{MetricsSnapshot, ObserverConfig};
//! use trainwatch::observer::{BroadcastObserver, ObserverChain, ShadowObserver};
//! use trainwatch::relay::{BroadcastRelay, LoopbackTransport};
//!
//! #[tokio::main]
//! async fn main() -> trainwatch::Result<()> {
//!     let config = ObserverConfig::from_file("observers.json")?;
//!     let relay = BroadcastRelay::from_config(&config, Arc::new(LoopbackTransport::new()))?;
//!     let broadcast = Arc::new(BroadcastObserver::new("retinanet", Arc::new(relay)));
//!     broadcast.start().await?;
//!
//!     let chain = ObserverChain::new()
//!         .with(Arc::new(ShadowObserver::from_config(&config)))
//!         .with(broadcast.clone());
//!
//!     for epoch in 0..3 {
//!         // train, write the checkpoint, then:
//!         let metrics = MetricsSnapshot::new().with_metric("loss", 0.4);
//!         chain.on_epoch_end(epoch, &metrics).await?;
//!     }
//!
//!     broadcast.relay().shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod observer;
pub mod relay;
pub mod shadow;

pub use crate::core::error::{Error, Result};
