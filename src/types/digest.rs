// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Metadata fingerprint.

use crate::config::DIGEST_LEN;

/// A 32-byte opaque content fingerprint (e.g. the sha2-256 part of an IPFS CIDv0).
///
/// The registry never interprets it. `Digest::ZERO` is what an unset entry
/// reads as, and it is also a legal value to write: readers cannot tell the two
/// apart and must treat zero as "no entry".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Digest(pub [u8; DIGEST_LEN]);

fixed_bytes!(Digest, DIGEST_LEN);
