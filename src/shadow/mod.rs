//! Checkpoint Shadow
//!
//! Keeps a data feed's persisted position aligned with model checkpoints:
//! - Feed state files on disk
//! - Lookahead-corrected shadow copies written at epoch end

pub mod checkpoint;
pub mod store;

pub use checkpoint::{CheckpointShadow, ShadowOutcome};
pub use store::{FeedStateStore, ShadowState};
