//! Batching debounce in front of a [`SnapshotSink`]. The first change after
//! a write opens a batch; one delayed write per batch stores whatever state
//! is current when it fires, so a steady stream of ticks cannot starve it.
//! The saver only tracks dirtiness and batch generations; whoever owns it
//! supplies the state at write time and schedules the wake-ups.

use std::time::Duration;

use contracts::PersistedState;
use tracing::debug;

use crate::error::PersistenceError;
use crate::persistence::SnapshotSink;

#[derive(Debug)]
pub struct DebouncedSaver {
    sink: Box<dyn SnapshotSink>,
    window: Duration,
    generation: u64,
    dirty: bool,
    writes: u64,
}

impl DebouncedSaver {
    pub fn new(sink: Box<dyn SnapshotSink>, window: Duration) -> Self {
        Self {
            sink,
            window,
            generation: 0,
            dirty: false,
            writes: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn load(&mut self) -> Result<Option<String>, PersistenceError> {
        self.sink.load()
    }

    /// Record a change. Returns `Some(generation)` when this change opens a
    /// new batch and the caller must schedule a delayed write for it;
    /// changes joining an open batch return `None`.
    pub fn mark_dirty(&mut self) -> Option<u64> {
        if self.dirty {
            return None;
        }
        self.dirty = true;
        self.generation = self.generation.wrapping_add(1);
        Some(self.generation)
    }

    /// True when the delayed write for batch `generation` should run now.
    pub fn is_due(&self, generation: u64) -> bool {
        self.dirty && self.generation == generation
    }

    /// Write immediately if anything changed since the last write.
    pub fn flush(&mut self, state: &PersistedState) -> Result<bool, PersistenceError> {
        if !self.dirty {
            return Ok(false);
        }
        self.sink.save(state)?;
        self.dirty = false;
        self.writes += 1;
        debug!(generation = self.generation, writes = self.writes, "snapshot flushed");
        Ok(true)
    }
}
