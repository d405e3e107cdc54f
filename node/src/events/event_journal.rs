// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Journal
//!
//! Maintains the distinction between:
//! - **committed** = canonical truth (replayed state)
//! - **buffer** = shadow execution (pending commit)
//!
//! Only `commit_buffer()` promotes events to truth. A crash while events sit
//! in the buffer loses nothing that was acknowledged.

use avatar_kernel::event::RegistryEvent;

#[derive(Clone, Debug, Default)]
pub struct EventJournal {
    /// Committed events (canonical truth)
    committed: Vec<RegistryEvent>,

    /// Buffered events (shadow execution, not yet truth)
    buffer: Vec<RegistryEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal from committed events (recovery scenario)
    pub fn from_committed(events: Vec<RegistryEvent>) -> Self {
        Self {
            committed: events,
            buffer: Vec::new(),
        }
    }

    pub fn append_buffered(&mut self, event: RegistryEvent) {
        self.buffer.push(event);
    }

    /// Promotes buffered events to canonical truth.
    ///
    /// Call only after the events are durable and the shadow apply passed.
    pub fn commit_buffer(&mut self) {
        self.committed.append(&mut self.buffer);
    }

    pub fn rollback_buffer(&mut self) {
        self.buffer.clear();
    }

    pub fn committed(&self) -> &[RegistryEvent] {
        &self.committed
    }

    pub fn buffered(&self) -> &[RegistryEvent] {
        &self.buffer
    }

    /// Committed event count; also the offset the next event will get.
    pub fn committed_height(&self) -> u64 {
        self.committed.len() as u64
    }

    pub fn has_pending_buffer(&self) -> bool {
        !self.buffer.is_empty()
    }
}
