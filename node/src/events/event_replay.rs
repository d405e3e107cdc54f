// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Replay - Authoritative Recovery
//!
//! **Event Log ALWAYS wins. Snapshot is just a cache.**
//!
//! # Recovery Protocol
//! 1. Load event log (canonical truth)
//! 2. Start from the genesis seeder
//! 3. Replay committed events into fresh state; membership is never consulted
//! 4. Check every checkpoint against the replayed state
//!
//! # Invariants
//! - Torn final frame → ignored, replay up to the last complete write
//! - Damage anywhere else → fail closed
//! - Checkpoint hash ≠ replay hash → fail closed
//! - If snapshot hash ≠ replay hash → discard snapshot

use std::path::Path;

use avatar_kernel::error::RegistryError;
use avatar_kernel::state::registry::RegistryState;
use avatar_kernel::verify::state_hash;
use thiserror::Error;

use crate::events::event_journal::EventJournal;
use crate::events::event_log::{decode_log, EventLogError, LogEntry};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    EventLog(#[from] EventLogError),

    #[error("Event log has no genesis entry")]
    MissingGenesis,

    #[error("Unexpected genesis entry at index {index}")]
    UnexpectedGenesis { index: usize },

    #[error("Event application failed at entry {index}: {error}")]
    EventApplication { index: usize, error: RegistryError },

    #[error("Checkpoint at entry {index} does not match replayed state")]
    CheckpointMismatch { index: usize },
}

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Reads every intact entry of a log file, in commit order.
pub fn read_event_log(path: impl AsRef<Path>) -> Result<Vec<LogEntry>> {
    let path = path.as_ref();
    let buf = std::fs::read(path).map_err(EventLogError::from)?;
    let decoded = decode_log(&buf)?;

    if decoded.torn_tail {
        tracing::warn!(
            "Ignoring incomplete frame at end of {:?} (offset {})",
            path,
            decoded.valid_len
        );
    }

    Ok(decoded.entries)
}

/// Replays log entries into a fresh registry.
pub fn replay_entries(entries: &[LogEntry]) -> Result<(RegistryState, EventJournal)> {
    let mut iter = entries.iter().enumerate();

    let mut state = match iter.next() {
        Some((_, LogEntry::Genesis { seeder })) => RegistryState::with_seeder(*seeder),
        _ => return Err(ReplayError::MissingGenesis),
    };
    let mut committed = Vec::new();

    for (index, entry) in iter {
        match entry {
            LogEntry::Genesis { .. } => return Err(ReplayError::UnexpectedGenesis { index }),
            LogEntry::Commit { events } => {
                for event in events {
                    state
                        .apply_event(event)
                        .map_err(|error| ReplayError::EventApplication { index, error })?;
                }
                committed.extend_from_slice(events);
            }
            LogEntry::Checkpoint {
                event_count,
                state_hash: expected,
                ..
            } => {
                if *event_count != committed.len() as u64 || *expected != state_hash(&state) {
                    return Err(ReplayError::CheckpointMismatch { index });
                }
                tracing::debug!("Checkpoint verified at entry {} ({} events)", index, event_count);
            }
        }
    }

    Ok((state, EventJournal::from_committed(committed)))
}

/// Rebuild the registry from an event log file.
pub fn recover_from_event_log(path: impl AsRef<Path>) -> Result<(RegistryState, EventJournal)> {
    let path = path.as_ref();
    tracing::info!("Recovering registry from event log: {:?}", path);

    let entries = read_event_log(path)?;
    let (state, journal) = replay_entries(&entries)?;

    tracing::info!(
        "Replayed {} events; state hash {}",
        journal.committed_height(),
        hex::encode(state_hash(&state))
    );
    Ok((state, journal))
}

/// True when a snapshot describes exactly the replayed state.
pub fn verify_snapshot_consistency(snapshot: &RegistryState, replayed: &RegistryState) -> bool {
    state_hash(snapshot) == state_hash(replayed)
}
