// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! CIDv0 rendering of a digest.
//!
//! A CIDv0 is the base58 form of a sha2-256 multihash: `0x12` (sha2-256),
//! `0x20` (32 bytes), then the digest. Every such string starts with "Qm".

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::encoding::base58::{self, Base58Error};
use crate::types::digest::Digest;

/// Multihash code for sha2-256.
pub const SHA2_256: u8 = 0x12;
/// Multihash length byte for a 32-byte digest.
pub const DIGEST_SIZE: u8 = 0x20;
/// Every sha2-256 CIDv0 is this many base58 characters.
pub const CID_V0_LEN: usize = 46;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CidError {
    /// Not [`CID_V0_LEN`] characters long; rejected before decoding.
    InvalidLength(usize),
    Base58(Base58Error),
    /// Decoded bytes are not `0x12 0x20 || 32 bytes`.
    NotSha256Multihash,
}

impl fmt::Display for CidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CidError::InvalidLength(len) => {
                write!(f, "CIDv0 must be {} characters, got {}", CID_V0_LEN, len)
            }
            CidError::Base58(e) => write!(f, "{}", e),
            CidError::NotSha256Multihash => f.write_str("not a sha2-256 CIDv0"),
        }
    }
}

impl From<Base58Error> for CidError {
    fn from(e: Base58Error) -> Self {
        CidError::Base58(e)
    }
}

pub fn to_cid_v0(digest: &Digest) -> String {
    let mut multihash = Vec::with_capacity(34);
    multihash.push(SHA2_256);
    multihash.push(DIGEST_SIZE);
    multihash.extend_from_slice(digest.as_bytes());
    base58::encode(&multihash)
}

pub fn from_cid_v0(cid: &str) -> Result<Digest, CidError> {
    if cid.len() != CID_V0_LEN {
        return Err(CidError::InvalidLength(cid.len()));
    }
    let bytes = base58::decode(cid)?;
    match bytes.as_slice() {
        [SHA2_256, DIGEST_SIZE, rest @ ..] if rest.len() == 32 => {
            Digest::from_slice(rest).map_err(|_| CidError::NotSha256Multihash)
        }
        _ => Err(CidError::NotSha256Multihash),
    }
}

impl Digest {
    /// IPFS CIDv0 ("Qm...") for this digest.
    pub fn to_cid_v0(&self) -> String {
        to_cid_v0(self)
    }
}
