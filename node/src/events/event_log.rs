// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Event Log Writer
//!
//! This is the CANONICAL durability layer.
//! - Every write is one frame and is fsync'd before the write is acknowledged
//! - A whole batch is a single frame: a crash cannot persist half of it
//! - A torn frame at the tail is cut off when the log is reopened
//! - A failed append is cut off before the next one, or the writer refuses
//!   further appends
//!
//! # File Format
//! ```text
//! [Header: 16 bytes][Frame][Frame][Frame]...
//! ```
//!
//! Header:
//! - magic: "AVLG"
//! - version: u32 (1)
//! - reserved: u64 (0)
//!
//! Frame:
//! - len: u32 LE (payload length)
//! - crc: u32 LE (CRC32 of payload)
//! - payload: bincode(LogEntry)

use avatar_kernel::event::RegistryEvent;
use avatar_kernel::types::id::Identity;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAGIC: &[u8; 4] = b"AVLG";
pub const LOG_VERSION: u32 = 1;
pub const HEADER_LEN: usize = 16;
const FRAME_HEADER_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid header")]
    InvalidHeader,

    #[error("Event log corrupted at offset {offset}")]
    Corrupted { offset: usize },

    #[error("Event log writer poisoned by an earlier failed append")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, EventLogError>;

/// One durable record of the log.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogEntry {
    /// First entry of every log: the seeder the registry was created with.
    Genesis { seeder: Option<Identity> },
    /// All events produced by one accepted write, in order.
    Commit { events: Vec<RegistryEvent> },
    /// State summary written next to a snapshot.
    Checkpoint {
        event_count: u64,
        state_hash: [u8; 32],
        timestamp: u64,
    },
}

/// Event Log File Header (16 bytes)
struct EventLogHeader {
    version: u32,
    reserved: u64,
}

impl EventLogHeader {
    fn new() -> Self {
        Self {
            version: LOG_VERSION,
            reserved: 0,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.reserved.to_le_bytes());
        bytes
    }

    fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[0..4] != MAGIC {
            return Err(EventLogError::InvalidHeader);
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..8]);
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&bytes[8..16]);

        let header = Self {
            version: u32::from_le_bytes(version),
            reserved: u64::from_le_bytes(reserved),
        };
        if header.version != LOG_VERSION {
            return Err(EventLogError::InvalidHeader);
        }
        Ok(header)
    }
}

/// Encodes one entry as a checksummed frame.
pub fn encode_frame(entry: &LogEntry) -> Result<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(entry, bincode::config::standard())
        .map_err(|e| EventLogError::Serialization(e.to_string()))?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Entries decoded from a whole log file.
#[derive(Debug)]
pub struct DecodedLog {
    pub entries: Vec<LogEntry>,
    /// Bytes up to the end of the last intact frame (header included).
    pub valid_len: usize,
    /// Whether an incomplete frame followed the last intact one.
    pub torn_tail: bool,
}

/// Decodes header and frames.
///
/// An incomplete or checksum-failing final frame is a torn write and is
/// reported through `torn_tail`. Any damage before the final frame fails
/// closed with [`EventLogError::Corrupted`].
pub fn decode_log(buf: &[u8]) -> Result<DecodedLog> {
    EventLogHeader::parse(buf)?;

    let mut entries = Vec::new();
    let mut offset = HEADER_LEN;

    while offset < buf.len() {
        let remaining = buf.len() - offset;
        if remaining < FRAME_HEADER_LEN {
            return Ok(DecodedLog { entries, valid_len: offset, torn_tail: true });
        }

        let mut len = [0u8; 4];
        len.copy_from_slice(&buf[offset..offset + 4]);
        let len = u32::from_le_bytes(len) as usize;
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&buf[offset + 4..offset + 8]);
        let crc = u32::from_le_bytes(crc);

        let end = offset + FRAME_HEADER_LEN + len;
        if end > buf.len() {
            return Ok(DecodedLog { entries, valid_len: offset, torn_tail: true });
        }

        let payload = &buf[offset + FRAME_HEADER_LEN..end];
        if crc32fast::hash(payload) != crc {
            if end == buf.len() {
                return Ok(DecodedLog { entries, valid_len: offset, torn_tail: true });
            }
            return Err(EventLogError::Corrupted { offset });
        }

        let (entry, read) = bincode::serde::decode_from_slice::<LogEntry, _>(
            payload,
            bincode::config::standard(),
        )
        .map_err(|_| EventLogError::Corrupted { offset })?;
        if read != payload.len() {
            return Err(EventLogError::Corrupted { offset });
        }

        entries.push(entry);
        offset = end;
    }

    Ok(DecodedLog { entries, valid_len: offset, torn_tail: false })
}

/// Append-Only Event Log Writer
pub struct EventLogWriter {
    path: PathBuf,
    file: File,
    /// File length after the last intact frame.
    valid_len: u64,
    poisoned: bool,
    entry_count: u64,
    event_count: u64,
    #[cfg(test)]
    fail_write_after: Option<usize>,
}

impl EventLogWriter {
    /// Open or create an event log file.
    ///
    /// An existing file has its header and frames validated; a torn tail is
    /// truncated away so new frames follow the last intact one. A new file
    /// gets a header and no entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file_exists = path.exists() && std::fs::metadata(&path)?.len() > 0;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let mut entry_count = 0;
        let mut event_count = 0;
        let valid_len;

        if file_exists {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            let decoded = decode_log(&buf)?;

            if decoded.torn_tail {
                tracing::warn!(
                    "Truncating torn frame at end of {:?} (offset {})",
                    path,
                    decoded.valid_len
                );
                file.set_len(decoded.valid_len as u64)?;
                file.sync_all()?;
            }

            entry_count = decoded.entries.len() as u64;
            event_count = count_events(&decoded.entries);
            valid_len = decoded.valid_len as u64;
        } else {
            file.write_all(&EventLogHeader::new().to_bytes())?;
            file.sync_all()?;
            valid_len = HEADER_LEN as u64;
        }

        Ok(Self {
            path,
            file,
            valid_len,
            poisoned: false,
            entry_count,
            event_count,
            #[cfg(test)]
            fail_write_after: None,
        })
    }

    /// Append an entry to the log.
    ///
    /// Only returns Ok() after the frame is written and fsync'd. On failure
    /// the file is cut back to the last intact frame; if that also fails the
    /// writer is poisoned and refuses every later append.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        if self.poisoned {
            return Err(EventLogError::Poisoned);
        }
        let frame = encode_frame(entry)?;

        if let Err(e) = self.write_frame(&frame) {
            tracing::error!("Append to {:?} failed: {}. Discarding partial frame.", self.path, e);
            if let Err(trunc) = self.discard_partial() {
                tracing::error!("Could not truncate {:?}: {}. Writer poisoned.", self.path, trunc);
                self.poisoned = true;
            }
            return Err(e.into());
        }

        self.valid_len += frame.len() as u64;
        self.entry_count += 1;
        if let LogEntry::Commit { events } = entry {
            self.event_count += events.len() as u64;
        }

        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        #[cfg(test)]
        {
            if let Some(n) = self.fail_write_after.take() {
                self.file.write_all(&frame[..n.min(frame.len())])?;
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"));
            }
        }

        self.file.write_all(frame)?;
        self.file.sync_all()
    }

    fn discard_partial(&mut self) -> std::io::Result<()> {
        self.file.set_len(self.valid_len)?;
        self.file.sync_all()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Number of frames in the log.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Number of registry events across all commit frames.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn count_events(entries: &[LogEntry]) -> u64 {
    entries
        .iter()
        .map(|entry| match entry {
            LogEntry::Commit { events } => events.len() as u64,
            _ => 0,
        })
        .sum()
}
