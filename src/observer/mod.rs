//! Training Observers
//!
//! Hooks the training loop calls at epoch boundaries:
//! - Observer trait and ordered chain
//! - Checkpoint shadow observer
//! - Metrics broadcast observer

pub mod callbacks;
pub mod epoch;

pub use callbacks::{epoch_summary, startup_notice, BroadcastObserver, ShadowObserver};
pub use epoch::{EpochObserver, ObserverChain};
