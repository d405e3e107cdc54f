// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use core::fmt;

use crate::types::id::Identity;

/// Rejection of a registry write. State is unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Target identity is neither a user with a token nor an organization.
    InvalidMember { identity: Identity },
    /// Caller is not the current seeder, or the seeder role was renounced.
    UnauthorizedSeeder { caller: Identity },
    /// Batch arrays differ in length.
    LengthMismatch { identities: usize, digests: usize },
}

impl RegistryError {
    /// Stable name used in logs, metrics labels and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::InvalidMember { .. } => "InvalidMember",
            RegistryError::UnauthorizedSeeder { .. } => "UnauthorizedSeeder",
            RegistryError::LengthMismatch { .. } => "LengthMismatch",
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidMember { identity } => {
                write!(f, "{} is not a recognized member", identity)
            }
            RegistryError::UnauthorizedSeeder { caller } => {
                write!(f, "{} is not the seeder", caller)
            }
            RegistryError::LengthMismatch { identities, digests } => write!(
                f,
                "batch length mismatch: {} identities, {} digests",
                identities, digests
            ),
        }
    }
}

/// Failure to parse an identity or digest from text or bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    InvalidHex,
    InvalidLength { expected: usize, found: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidHex => f.write_str("invalid hex"),
            ParseError::InvalidLength { expected, found } => {
                write!(f, "expected {} bytes, found {}", expected, found)
            }
        }
    }
}

pub type KernelResult<T> = core::result::Result<T, RegistryError>;
pub type Result<T> = KernelResult<T>;
