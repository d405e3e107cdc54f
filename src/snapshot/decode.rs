// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot decoding.

use alloc::collections::BTreeMap;

use crate::snapshot::encode::{MAGIC, SCHEMA_VERSION};
use crate::snapshot::SnapshotError;
use crate::state::registry::RegistryState;
use crate::types::digest::Digest;
use crate::types::id::{Identity, Version};
use crate::verify::state_hash;

type Result<T> = core::result::Result<T, SnapshotError>;

fn take<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    if *offset + len > buf.len() {
        return Err(SnapshotError::Truncated);
    }
    let slice = &buf[*offset..*offset + len];
    *offset += len;
    Ok(slice)
}

fn read_u8(buf: &[u8], offset: &mut usize) -> Result<u8> {
    Ok(take(buf, offset, 1)?[0])
}

fn read_u32(buf: &[u8], offset: &mut usize) -> Result<u32> {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(take(buf, offset, 4)?);
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(buf: &[u8], offset: &mut usize) -> Result<u64> {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(take(buf, offset, 8)?);
    Ok(u64::from_le_bytes(bytes))
}

fn read_identity(buf: &[u8], offset: &mut usize) -> Result<Identity> {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(take(buf, offset, 20)?);
    Ok(Identity(bytes))
}

fn read_digest(buf: &[u8], offset: &mut usize) -> Result<Digest> {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(take(buf, offset, 32)?);
    Ok(Digest(bytes))
}

pub fn decode_state(buf: &[u8]) -> Result<RegistryState> {
    let mut offset = 0;

    // Header
    if take(buf, &mut offset, 4)? != MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    let schema_ver = read_u32(buf, &mut offset)?;
    if schema_ver != SCHEMA_VERSION {
        return Err(SnapshotError::UnsupportedSchema(schema_ver));
    }

    let version = read_u64(buf, &mut offset)?;

    let seeder = match read_u8(buf, &mut offset)? {
        0 => None,
        1 => Some(read_identity(buf, &mut offset)?),
        other => return Err(SnapshotError::BadSeederFlag(other)),
    };

    let count = read_u32(buf, &mut offset)?;
    let mut digests = BTreeMap::new();
    let mut last: Option<Identity> = None;
    for _ in 0..count {
        let identity = read_identity(buf, &mut offset)?;
        let digest = read_digest(buf, &mut offset)?;
        if last.map_or(false, |prev| prev >= identity) {
            return Err(SnapshotError::UnorderedEntries);
        }
        last = Some(identity);
        digests.insert(identity, digest);
    }

    let state = RegistryState {
        version: Version(version),
        digests,
        seeder,
    };

    let stored_hash = take(buf, &mut offset, 32)?;
    if stored_hash != state_hash(&state) {
        return Err(SnapshotError::HashMismatch);
    }

    if offset != buf.len() {
        return Err(SnapshotError::TrailingBytes);
    }

    Ok(state)
}
