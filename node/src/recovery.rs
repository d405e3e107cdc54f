// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Startup Recovery
//!
//! Decides where the registry comes from when the node starts:
//! - Existing event log → replay it (canonical truth); the snapshot, if any,
//!   is only checked against the replayed state
//! - New event log → write genesis with the configured seeder
//! - No event log → restore the snapshot if present, else start fresh

use std::path::Path;

use avatar_kernel::state::registry::RegistryState;
use avatar_kernel::types::id::Identity;

use crate::config::NodeConfig;
use crate::errors::EngineError;
use crate::events::event_replay::{recover_from_event_log, verify_snapshot_consistency};
use crate::events::{EventJournal, EventLogWriter, LogEntry};
use crate::persistence::SnapshotManager;

pub struct Recovered {
    pub state: RegistryState,
    pub journal: EventJournal,
    pub event_log: Option<EventLogWriter>,
}

/// Check if a log file exists and holds at least a full header.
pub fn has_event_log(path: &Path) -> bool {
    path.exists()
        && std::fs::metadata(path)
            .map(|m| m.len() >= crate::events::event_log::HEADER_LEN as u64)
            .unwrap_or(false)
}

pub fn bootstrap(cfg: &NodeConfig) -> Result<Recovered, EngineError> {
    match &cfg.event_log_path {
        Some(path) if has_event_log(path) => recover_existing(cfg, path),
        Some(path) => create_log(path, cfg.seeder),
        None => Ok(Recovered {
            state: restore_or_fresh(cfg)?,
            journal: EventJournal::new(),
            event_log: None,
        }),
    }
}

fn recover_existing(cfg: &NodeConfig, path: &Path) -> Result<Recovered, EngineError> {
    let start = std::time::Instant::now();
    let (state, journal) = recover_from_event_log(path)?;
    metrics::histogram!("avatar_replay_duration_seconds", start.elapsed().as_secs_f64());

    if cfg.seeder.is_some() && cfg.seeder != genesis_seeder(path)? {
        tracing::warn!("Configured seeder ignored: the event log defines the registry seeder");
    }

    if let Some(snapshot_path) = &cfg.snapshot_path {
        validate_snapshot(snapshot_path, &state);
    }

    // Reopening truncates a torn tail before new frames land after it.
    let event_log = EventLogWriter::open(path)?;
    Ok(Recovered {
        state,
        journal,
        event_log: Some(event_log),
    })
}

fn genesis_seeder(path: &Path) -> Result<Option<Identity>, EngineError> {
    let entries = crate::events::event_replay::read_event_log(path)?;
    Ok(match entries.first() {
        Some(LogEntry::Genesis { seeder }) => *seeder,
        _ => None,
    })
}

fn create_log(path: &Path, seeder: Option<Identity>) -> Result<Recovered, EngineError> {
    tracing::info!("Creating event log at {:?}", path);
    let mut event_log = EventLogWriter::open(path)?;
    event_log.append(&LogEntry::Genesis { seeder })?;

    Ok(Recovered {
        state: RegistryState::with_seeder(seeder),
        journal: EventJournal::new(),
        event_log: Some(event_log),
    })
}

fn restore_or_fresh(cfg: &NodeConfig) -> Result<RegistryState, EngineError> {
    match &cfg.snapshot_path {
        Some(path) if path.exists() => {
            tracing::info!("Found snapshot at {:?}. Loading...", path);
            let state = SnapshotManager::load(path)?;
            tracing::info!("Snapshot restored: {} entries", state.len());
            Ok(state)
        }
        _ => Ok(RegistryState::with_seeder(cfg.seeder)),
    }
}

/// Event log wins: a diverging or unreadable snapshot is only reported.
pub fn validate_snapshot(snapshot_path: &Path, replayed: &RegistryState) -> bool {
    if !snapshot_path.exists() {
        tracing::debug!("No snapshot to validate");
        return true;
    }

    match SnapshotManager::load(snapshot_path) {
        Ok(snapshot) if verify_snapshot_consistency(&snapshot, replayed) => {
            tracing::info!("Snapshot matches replayed state");
            true
        }
        Ok(_) => {
            tracing::warn!("Snapshot {:?} diverges from event log; ignoring it", snapshot_path);
            false
        }
        Err(e) => {
            tracing::warn!("Snapshot {:?} unreadable ({}); ignoring it", snapshot_path, e);
            false
        }
    }
}
