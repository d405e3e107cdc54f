// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event-Sourced Persistence Layer
//!
//! # Architecture
//! - Event Log = Primary truth (append-only, durable)
//! - Snapshots = Startup shortcut (disposable)
//! - Journal = Runtime state (buffer + committed)
//!
//! # Guarantees
//! - Events are fsync'd before they become visible
//! - One accepted write is one frame, so a batch is never half-durable
//! - Recovery replays the log without consulting membership

pub mod event_log;
pub mod event_journal;
pub mod event_replay;
pub mod event_commit;
pub mod event_proof;

pub use event_log::{EventLogWriter, LogEntry};
pub use event_journal::EventJournal;
pub use event_replay::recover_from_event_log;
pub use event_commit::{CommitResult, EventCommitter, Notification};
pub use event_proof::EventProof;
