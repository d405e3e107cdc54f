// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic Hashing and Verification.

use crate::state::registry::RegistryState;

/// Computes the canonical BLAKE3 hash of a registry state.
///
/// # Hash Input Structure
/// ```text
/// version (u64 LE)
/// seeder  (0x00 | 0x01 ++ 20 bytes)
/// entry count (u64 LE)
/// For each entry (identity order):
///   identity (20 bytes)
///   digest   (32 bytes)
/// ```
///
/// Entries holding the zero digest are hashed like any other: a written zero
/// and an unwritten key are different states even though reads agree.
pub fn state_hash(state: &RegistryState) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&state.version.0.to_le_bytes());

    match state.seeder {
        Some(seeder) => {
            hasher.update(&[1]);
            hasher.update(seeder.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }

    hasher.update(&(state.digests.len() as u64).to_le_bytes());
    for (identity, digest) in state.digests.iter() {
        hasher.update(identity.as_bytes());
        hasher.update(digest.as_bytes());
    }

    *hasher.finalize().as_bytes()
}

/// BLAKE3 of an arbitrary byte slice (snapshot files, event logs).
pub fn bytes_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}
