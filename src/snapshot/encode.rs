// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot encoding.

use alloc::vec::Vec;

use crate::state::registry::RegistryState;
use crate::verify::state_hash;

pub const MAGIC: &[u8; 4] = b"AVSN";
pub const SCHEMA_VERSION: u32 = 1;

fn write_u32(buf: &mut Vec<u8>, val: u32) {
    buf.extend_from_slice(&val.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, val: u64) {
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Exact encoded size of `state`.
pub fn encoded_len(state: &RegistryState) -> usize {
    let seeder = if state.seeder.is_some() { 1 + 20 } else { 1 };
    4 + 4 + 8 + seeder + 4 + state.digests.len() * (20 + 32) + 32
}

pub fn encode_state(state: &RegistryState) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(state));

    // Header
    buf.extend_from_slice(MAGIC);
    write_u32(&mut buf, SCHEMA_VERSION);
    write_u64(&mut buf, state.version.0);

    match state.seeder {
        Some(seeder) => {
            buf.push(1);
            buf.extend_from_slice(seeder.as_bytes());
        }
        None => buf.push(0),
    }

    // Entries (BTreeMap iteration is identity order)
    write_u32(&mut buf, state.digests.len() as u32);
    for (identity, digest) in state.digests.iter() {
        buf.extend_from_slice(identity.as_bytes());
        buf.extend_from_slice(digest.as_bytes());
    }

    buf.extend_from_slice(&state_hash(state));
    buf
}
