//! Per-stream checkpoint cursors and their persistence.
//!
//! A checkpoint is the server's opaque `next_checkpoint` cursor. The store
//! keeps one per stream, bootstraps missing ones from the server head, and
//! only ever moves a persisted cursor forward.

use crate::error::{PullError, Result};
use crate::stream::Stream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod bootstrap;
mod store;


pub use bootstrap::{bootstrap_checkpoint, BOOTSTRAP_FROM, LOOKBACK};
pub use store::CheckpointStore;

/// Mapping from stream to its last fully consumed checkpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointSet {
    checkpoints: BTreeMap<Stream, i64>,
}

impl CheckpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stream: Stream) -> Option<i64> {
        self.checkpoints.get(&stream).copied()
    }

    pub fn contains(&self, stream: Stream) -> bool {
        self.checkpoints.contains_key(&stream)
    }

    /// Sets a checkpoint unconditionally (bootstrap).
    pub fn set(&mut self, stream: Stream, checkpoint: i64) {
        self.checkpoints.insert(stream, checkpoint);
    }

    /// Moves a checkpoint forward. A value behind the current one is rejected.
    pub fn advance(&mut self, stream: Stream, checkpoint: i64) -> Result<()> {
        if let Some(current) = self.get(stream) {
            if checkpoint < current {
                return Err(PullError::Protocol(format!(
                    "checkpoint for {} would move backwards from {} to {}",
                    stream, current, checkpoint
                )));
            }
        }
        self.set(stream, checkpoint);
        Ok(())
    }

    /// Streams from `wanted` that have no checkpoint yet.
    pub fn missing(&self, wanted: &[Stream]) -> Vec<Stream> {
        wanted
            .iter()
            .copied()
            .filter(|s| !self.contains(*s))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stream, i64)> + '_ {
        self.checkpoints.iter().map(|(s, c)| (*s, *c))
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
