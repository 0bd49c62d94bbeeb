//! On-disk feed state.
//!
//! A data feed persists its position as two files in one directory:
//! `groups.dump` (opaque batching plan) and `group_index.dump` (cursor).
//! The checkpoint-aligned copies live next to them under
//! `*_at_checkpoint.dump` names. Shadow files are staged with a `.tmp`
//! extension and renamed into place, so a failed write leaves the previous
//! shadow intact.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const GROUPS_FILE: &str = "groups.dump";
pub const GROUP_INDEX_FILE: &str = "group_index.dump";
pub const SHADOW_GROUPS_FILE: &str = "groups_at_checkpoint.dump";
pub const SHADOW_GROUP_INDEX_FILE: &str = "group_index_at_checkpoint.dump";
const STAGING_SUFFIX: &str = "tmp";

/// Checkpoint-aligned copy of a feed's persisted position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowState {
    /// Verbatim copy of the batching plan
    pub groups: Vec<u8>,
    /// Cursor corrected for the feed's lookahead
    pub group_index: u64,
}

/// Reads and writes feed state files under a single directory.
#[derive(Clone, Debug)]
pub struct FeedStateStore {
    dir: PathBuf,
}

impl FeedStateStore {
    /// Create a store rooted at `dir`. Nothing is touched on disk.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn groups_path(&self) -> PathBuf {
        self.dir.join(GROUPS_FILE)
    }

    pub fn group_index_path(&self) -> PathBuf {
        self.dir.join(GROUP_INDEX_FILE)
    }

    pub fn shadow_groups_path(&self) -> PathBuf {
        self.dir.join(SHADOW_GROUPS_FILE)
    }

    pub fn shadow_group_index_path(&self) -> PathBuf {
        self.dir.join(SHADOW_GROUP_INDEX_FILE)
    }

    /// Fail with [`Error::Io`] unless the store directory exists and is a
    /// directory.
    pub fn ensure_dir(&self) -> Result<()> {
        let meta = fs::metadata(&self.dir)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", self.dir.display()),
            )
            .into());
        }
        Ok(())
    }

    /// Whether both live state files exist. Stat failures propagate.
    pub fn has_live_state(&self) -> Result<bool> {
        Ok(self.groups_path().try_exists()? && self.group_index_path().try_exists()?)
    }

    /// Whether both shadow files exist. Stat failures propagate.
    pub fn has_shadow_state(&self) -> Result<bool> {
        Ok(self.shadow_groups_path().try_exists()? && self.shadow_group_index_path().try_exists()?)
    }

    /// Write the live batching plan.
    pub fn write_groups(&self, groups: &[u8]) -> Result<()> {
        fs::write(self.groups_path(), groups)?;
        Ok(())
    }

    /// Read the live batching plan.
    pub fn read_groups(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.groups_path())?)
    }

    /// Write the live cursor.
    pub fn write_group_index(&self, index: u64) -> Result<()> {
        write_index(&self.group_index_path(), index)
    }

    /// Read the live cursor.
    pub fn read_group_index(&self) -> Result<u64> {
        read_index(&self.group_index_path())
    }

    /// Replace the shadow pair: a byte-for-byte copy of the live batching
    /// plan and the corrected cursor `index`.
    ///
    /// Both files are staged first and only renamed into place once both
    /// writes succeed. Returns the number of plan bytes copied.
    pub fn write_shadow(&self, index: u64) -> Result<u64> {
        let groups_staged = self.shadow_groups_path().with_extension(STAGING_SUFFIX);
        let index_staged = self.shadow_group_index_path().with_extension(STAGING_SUFFIX);

        let staged = fs::copy(self.groups_path(), &groups_staged)
            .map_err(Error::from)
            .and_then(|copied| write_index(&index_staged, index).map(|_| copied));
        let copied = match staged {
            Ok(copied) => copied,
            Err(e) => {
                let _ = fs::remove_file(&groups_staged);
                let _ = fs::remove_file(&index_staged);
                return Err(e);
            }
        };

        fs::rename(&groups_staged, self.shadow_groups_path())?;
        fs::rename(&index_staged, self.shadow_group_index_path())?;
        Ok(copied)
    }

    /// Read the shadow state, `None` if it has not been written yet.
    pub fn read_shadow(&self) -> Result<Option<ShadowState>> {
        if !self.has_shadow_state()? {
            return Ok(None);
        }
        Ok(Some(ShadowState {
            groups: fs::read(self.shadow_groups_path())?,
            group_index: read_index(&self.shadow_group_index_path())?,
        }))
    }
}

fn write_index(path: &Path, index: u64) -> Result<()> {
    let bytes = bincode::serialize(&index)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn read_index(path: &Path) -> Result<u64> {
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes).map_err(|e| Error::CorruptFeedState {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
