// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Commit - The Safety Wall
//!
//! Every state change passes the same barrier:
//! 1. Events buffered in the journal
//! 2. Shadow execution on a clone of the live state
//! 3. One frame persisted to the event log (fsync)
//! 4. Commit boundary applied
//! 5. Shadow installed as the live state
//! 6. Subscribers notified
//!
//! If any step before the boundary fails, the buffer is rolled back and the
//! live state is untouched.

use avatar_kernel::error::RegistryError;
use avatar_kernel::event::RegistryEvent;
use avatar_kernel::state::registry::RegistryState;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::events::event_journal::EventJournal;
use crate::events::event_log::{EventLogError, EventLogWriter, LogEntry};

/// Live subscribers that fall this far behind miss notifications.
pub const NOTIFICATION_CAPACITY: usize = 1024;

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Event log error: {0}")]
    EventLog(#[from] EventLogError),

    #[error("Shadow apply rejected event: {0}")]
    ShadowApply(RegistryError),
}

pub type Result<T> = std::result::Result<T, CommitError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    Committed,
    /// Shadow apply refused the events; nothing was written.
    RolledBack,
}

/// A committed event together with its position in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub offset: u64,
    pub event: RegistryEvent,
}

/// Event committer - enforces the commit barrier
pub struct EventCommitter {
    /// None keeps the registry in memory only.
    event_log: Option<EventLogWriter>,
    journal: EventJournal,
    live_state: RegistryState,
    notifier: broadcast::Sender<Notification>,
}

impl EventCommitter {
    pub fn new(
        event_log: Option<EventLogWriter>,
        journal: EventJournal,
        live_state: RegistryState,
    ) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            event_log,
            journal,
            live_state,
            notifier,
        }
    }

    /// Commit the events of one accepted write (the ONLY way to mutate state).
    ///
    /// Returns:
    /// - `Ok(CommitResult::Committed)` if all events are now truth
    /// - `Ok(CommitResult::RolledBack)` if shadow apply refused them
    /// - `Err(_)` if persistence failed; live state unchanged
    pub fn commit(&mut self, events: Vec<RegistryEvent>) -> Result<CommitResult> {
        if events.is_empty() {
            return Ok(CommitResult::Committed);
        }

        for event in &events {
            self.journal.append_buffered(*event);
        }

        let mut shadow = self.live_state.clone();
        for event in &events {
            if let Err(e) = shadow.apply_event(event) {
                tracing::warn!("Shadow apply failed: {}. Rolling back buffer.", e);
                self.journal.rollback_buffer();
                return Ok(CommitResult::RolledBack);
            }
        }

        if let Some(log) = self.event_log.as_mut() {
            if let Err(e) = log.append(&LogEntry::Commit { events: events.clone() }) {
                self.journal.rollback_buffer();
                return Err(e.into());
            }
        }

        // COMMIT BOUNDARY
        let first_offset = self.journal.committed_height();
        self.journal.commit_buffer();
        self.live_state = shadow;

        for (i, event) in events.into_iter().enumerate() {
            // No receivers is fine.
            let _ = self.notifier.send(Notification {
                offset: first_offset + i as u64,
                event,
            });
        }

        Ok(CommitResult::Committed)
    }

    /// Records a state summary in the log (no-op without one).
    pub fn checkpoint(&mut self, state_hash: [u8; 32], timestamp: u64) -> Result<()> {
        let event_count = self.journal.committed_height();
        if let Some(log) = self.event_log.as_mut() {
            log.append(&LogEntry::Checkpoint {
                event_count,
                state_hash,
                timestamp,
            })?;
        }
        Ok(())
    }

    /// Replaces the live state wholesale. Only valid before any event was
    /// committed and without a durable log.
    pub(crate) fn replace_state(&mut self, state: RegistryState) {
        self.live_state = state;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn state(&self) -> &RegistryState {
        &self.live_state
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn event_log(&self) -> Option<&EventLogWriter> {
        self.event_log.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_log::decode_log;
    use avatar_kernel::types::digest::Digest;
    use avatar_kernel::types::id::Identity;
    use tempfile::tempdir;

    const SEEDER: Identity = Identity([0x5e; 20]);

    fn update(n: u8) -> RegistryEvent {
        RegistryEvent::DigestUpdated {
            identity: Identity([n; 20]),
            digest: Digest([n; 32]),
        }
    }

    #[test]
    fn test_commit_applies_and_notifies() {
        let mut committer =
            EventCommitter::new(None, EventJournal::new(), RegistryState::new(SEEDER));
        let mut rx = committer.subscribe();

        let result = committer.commit(vec![update(1), update(2)]).unwrap();
        assert_eq!(result, CommitResult::Committed);
        assert_eq!(committer.journal().committed_height(), 2);
        assert_eq!(committer.state().digest_of(&Identity([2; 20])), Digest([2; 32]));

        assert_eq!(rx.try_recv().unwrap(), Notification { offset: 0, event: update(1) });
        assert_eq!(rx.try_recv().unwrap(), Notification { offset: 1, event: update(2) });
    }

    #[test]
    fn test_shadow_failure_rolls_back_whole_write() {
        let mut committer =
            EventCommitter::new(None, EventJournal::new(), RegistryState::new(SEEDER));
        let before = committer.state().clone();

        // The second event names a caller that is not the seeder.
        let result = committer
            .commit(vec![
                update(1),
                RegistryEvent::SeederRenounced { former: Identity([9; 20]) },
            ])
            .unwrap();

        assert_eq!(result, CommitResult::RolledBack);
        assert_eq!(committer.state(), &before);
        assert_eq!(committer.journal().committed_height(), 0);
        assert!(!committer.journal().has_pending_buffer());
    }

    #[test]
    fn test_batch_is_one_log_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let mut log = EventLogWriter::open(&path).unwrap();
        log.append(&LogEntry::Genesis { seeder: Some(SEEDER) }).unwrap();

        let mut committer =
            EventCommitter::new(Some(log), EventJournal::new(), RegistryState::new(SEEDER));
        committer.commit(vec![update(1), update(2), update(3)]).unwrap();

        let decoded = decode_log(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(decoded.entries.len(), 2);
        assert_eq!(
            decoded.entries[1],
            LogEntry::Commit { events: vec![update(1), update(2), update(3)] }
        );
    }
}
