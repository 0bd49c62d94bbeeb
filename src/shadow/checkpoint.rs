//! Checkpoint-aligned shadowing of feed state.
//!
//! Feeds prefetch ahead of the batch being trained on, so the cursor on disk
//! at checkpoint time is already `lookahead_depth` groups past what the model
//! has seen. The shadow copy subtracts that lookahead so a resumed run
//! starts at the checkpointed batch instead of skipping ahead.

use crate::core::{ObserverConfig, Result};
use crate::shadow::store::{FeedStateStore, ShadowState};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Outcome of a single shadowing pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShadowOutcome {
    /// No restore path configured
    Disabled,
    /// Feed has not persisted its state yet
    MissingState,
    /// Shadow files written
    Written {
        source_index: u64,
        shadow_index: u64,
    },
}

/// Writes checkpoint-aligned copies of a feed's persisted position.
pub struct CheckpointShadow {
    store: Option<FeedStateStore>,
    lookahead_depth: u64,
}

impl CheckpointShadow {
    /// Create a shadow; `restore_path = None` disables it.
    pub fn new(restore_path: Option<PathBuf>, lookahead_depth: u64) -> Self {
        Self {
            store: restore_path.map(FeedStateStore::new),
            lookahead_depth,
        }
    }

    /// Create from observer configuration.
    pub fn from_config(config: &ObserverConfig) -> Self {
        Self::new(config.restore_path.clone(), config.lookahead_depth)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn lookahead_depth(&self) -> u64 {
        self.lookahead_depth
    }

    pub fn store(&self) -> Option<&FeedStateStore> {
        self.store.as_ref()
    }

    /// Shadow the feed state after the checkpoint for `epoch` was written.
    ///
    /// A restore path that is missing or not a directory is an I/O error, as
    /// are other I/O and decode failures. Missing state files inside an
    /// existing directory are not an error.
    pub fn on_epoch_end(&self, epoch: usize) -> Result<ShadowOutcome> {
        let store = match &self.store {
            Some(store) => store,
            None => return Ok(ShadowOutcome::Disabled),
        };

        store.ensure_dir()?;
        if !store.has_live_state()? {
            debug!(epoch, dir = %store.dir().display(), "feed state not persisted yet, skipping shadow");
            return Ok(ShadowOutcome::MissingState);
        }

        let source_index = store.read_group_index()?;
        let shadow_index = self.adjust(source_index);
        if source_index < self.lookahead_depth {
            warn!(
                epoch,
                source_index,
                lookahead = self.lookahead_depth,
                "group index below lookahead depth, clamping shadow index to 0"
            );
        }

        let copied = store.write_shadow(shadow_index)?;

        info!(epoch, source_index, shadow_index, groups_bytes = copied, "feed state shadowed");
        Ok(ShadowOutcome::Written {
            source_index,
            shadow_index,
        })
    }

    /// Read back the last shadow written, if any.
    pub fn load_shadow(&self) -> Result<Option<ShadowState>> {
        match &self.store {
            Some(store) => store.read_shadow(),
            None => Ok(None),
        }
    }

    fn adjust(&self, index: u64) -> u64 {
        index.saturating_sub(self.lookahead_depth)
    }
}
