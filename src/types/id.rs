// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types.

use crate::config::IDENTITY_LEN;

/// An avatar address: opaque, fixed-width, compared only for equality and order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Identity(pub [u8; IDENTITY_LEN]);

fixed_bytes!(Identity, IDENTITY_LEN);

/// Count of change events applied to a registry state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Version(pub u64);

impl Version {
    pub fn next(&self) -> Self {
        Version(self.0 + 1)
    }
}
