// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! avatar-kernel: a permissioned identity → digest registry.
//!
//! Two write paths: members update their own digest, and a single seeder
//! writes batches until it renounces the role for good. Membership is decided
//! by an injected [`membership::MembershipOracle`].

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
pub mod error;
pub mod types;
pub mod membership;
pub mod event;
pub mod state;
pub mod snapshot;
pub mod verify;
pub mod encoding;

pub use error::{RegistryError, KernelResult};
pub use event::RegistryEvent;
pub use membership::{is_recognized_member, MembershipOracle, StaticMembership};
pub use state::command::Command;
pub use state::registry::RegistryState;
pub use types::digest::Digest;
pub use types::id::Identity;

#[cfg(test)]
pub mod tests;
