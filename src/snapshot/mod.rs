// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical binary snapshots of a registry state.
//!
//! # Format
//! ```text
//! magic "AVSN" | schema u32 | version u64 | seeder flag u8 [+ 20 bytes]
//! | entry count u32 | (identity 20 bytes, digest 32 bytes)* | state hash 32 bytes
//! ```
//! All integers little-endian; entries in identity order. The trailing hash is
//! [`crate::verify::state_hash`] of the encoded state and is checked on decode.

use core::fmt;

pub mod encode;
pub mod decode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    /// Buffer ended before the declared content.
    Truncated,
    BadMagic,
    UnsupportedSchema(u32),
    /// Seeder flag byte was neither 0 nor 1.
    BadSeederFlag(u8),
    /// Entries were not strictly ascending by identity.
    UnorderedEntries,
    /// Stored state hash does not match the decoded state.
    HashMismatch,
    /// Bytes left over after the state hash.
    TrailingBytes,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Truncated => f.write_str("snapshot truncated"),
            SnapshotError::BadMagic => f.write_str("snapshot magic mismatch"),
            SnapshotError::UnsupportedSchema(v) => write!(f, "unsupported snapshot schema {}", v),
            SnapshotError::BadSeederFlag(b) => write!(f, "invalid seeder flag {}", b),
            SnapshotError::UnorderedEntries => f.write_str("snapshot entries out of order"),
            SnapshotError::HashMismatch => f.write_str("snapshot state hash mismatch"),
            SnapshotError::TrailingBytes => f.write_str("trailing bytes after snapshot"),
        }
    }
}
