// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registry write requests.

use alloc::vec::Vec;

use crate::types::digest::Digest;
use crate::types::id::Identity;

/// A write request, carrying the identity of the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Caller sets its own digest.
    SelfUpdate {
        caller: Identity,
        digest: Digest,
    },
    /// Seeder sets digests for many identities at once.
    BatchUpdate {
        caller: Identity,
        identities: Vec<Identity>,
        digests: Vec<Digest>,
    },
    /// Seeder gives up the role.
    RenounceSeeder {
        caller: Identity,
    },
}

impl Command {
    pub fn caller(&self) -> Identity {
        match self {
            Command::SelfUpdate { caller, .. }
            | Command::BatchUpdate { caller, .. }
            | Command::RenounceSeeder { caller } => *caller,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::SelfUpdate { .. } => "SelfUpdate",
            Command::BatchUpdate { .. } => "BatchUpdate",
            Command::RenounceSeeder { .. } => "RenounceSeeder",
        }
    }
}
