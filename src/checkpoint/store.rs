use super::CheckpointSet;
use crate::error::Result;
use crate::state_file;
use crate::stream::Stream;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const CHECKPOINT_FILE_VERSION: u32 = 1;

/// On-disk layout of the checkpoint file.
#[derive(Serialize, Deserialize)]
struct CheckpointRecord {
    version: u32,
    updated_at: DateTime<Utc>,
    checkpoints: CheckpointSet,
}

/// Owns the in-memory checkpoint set and the file it is persisted to.
///
/// Loading and saving are explicit; nothing is written behind the caller's back
/// except by [`commit`](Self::commit).
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    checkpoints: CheckpointSet,
}

impl CheckpointStore {
    /// Creates an empty store backed by `path`. Nothing is read yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            checkpoints: CheckpointSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checkpoints(&self) -> &CheckpointSet {
        &self.checkpoints
    }

    pub fn get(&self, stream: Stream) -> Option<i64> {
        self.checkpoints.get(stream)
    }

    /// Sets a checkpoint in memory only.
    pub fn set(&mut self, stream: Stream, checkpoint: i64) {
        self.checkpoints.set(stream, checkpoint);
    }

    /// Replaces the in-memory set with the file contents.
    ///
    /// Returns `false` (leaving the set empty) when no file exists, in which
    /// case the caller must bootstrap every stream.
    pub fn load(&mut self) -> Result<bool> {
        let record: CheckpointRecord = match state_file::load::<CheckpointRecord>(&self.path)
            .context("Failed to load checkpoint state")?
        {
            Some(record) => record,
            None => {
                self.checkpoints = CheckpointSet::new();
                return Ok(false);
            }
        };

        if record.version != CHECKPOINT_FILE_VERSION {
            return Err(anyhow!(
                "Unsupported checkpoint file version {} in {}",
                record.version,
                self.path.display()
            )
            .into());
        }

        self.checkpoints = record.checkpoints;
        Ok(true)
    }

    /// Writes the full checkpoint set, overwriting the previous file.
    pub fn save(&self) -> Result<()> {
        let record = CheckpointRecord {
            version: CHECKPOINT_FILE_VERSION,
            updated_at: Utc::now(),
            checkpoints: self.checkpoints.clone(),
        };
        state_file::save(&self.path, &record).context("Failed to save checkpoint state")?;
        debug!(path = %self.path.display(), checkpoints = ?self.checkpoints, "Checkpoints saved");
        Ok(())
    }

    /// Advances a stream's checkpoint and persists the whole set.
    pub fn commit(&mut self, stream: Stream, checkpoint: i64) -> Result<()> {
        self.checkpoints.advance(stream, checkpoint)?;
        self.save()
    }
}
