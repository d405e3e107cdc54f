// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registry events.
//!
//! Every state transition is expressed as a `RegistryEvent`. Events are only
//! produced by an authorized command, so applying one never consults the
//! membership oracle again. That is what makes replay deterministic.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::types::digest::Digest;
use crate::types::id::Identity;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Change notification: `identity` now maps to `digest`.
    DigestUpdated { identity: Identity, digest: Digest },

    /// The seeder gave up its role for good.
    SeederRenounced { former: Identity },
}

impl RegistryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RegistryEvent::DigestUpdated { .. } => "DigestUpdated",
            RegistryEvent::SeederRenounced { .. } => "SeederRenounced",
        }
    }

    /// Deterministic binary form (bincode standard config).
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        // Encoding into a Vec has no failure path for these plain-data variants.
        bincode::serde::encode_to_vec(self, bincode::config::standard()).unwrap_or_default()
    }
}
