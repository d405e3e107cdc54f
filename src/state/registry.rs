// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Registry state and its authorization rules.
//!
//! Writes go through two passes. [`RegistryState::authorize`] checks every
//! precondition and turns a [`Command`] into the list of events it would
//! produce without touching state. [`RegistryState::apply_event`] then
//! mutates. A rejected command leaves nothing behind, so a batch is
//! all-or-nothing.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::error::{RegistryError, Result};
use crate::event::RegistryEvent;
use crate::membership::{is_recognized_member, MembershipOracle};
use crate::state::command::Command;
use crate::types::digest::Digest;
use crate::types::id::{Identity, Version};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryState {
    pub(crate) version: Version,
    pub(crate) digests: BTreeMap<Identity, Digest>,
    /// `None` once renounced; nothing ever sets it back.
    pub(crate) seeder: Option<Identity>,
}

impl RegistryState {
    pub fn new(seeder: Identity) -> Self {
        Self::with_seeder(Some(seeder))
    }

    /// Fresh state; `None` starts the registry with no privileged writer.
    pub fn with_seeder(seeder: Option<Identity>) -> Self {
        Self {
            version: Version(0),
            digests: BTreeMap::new(),
            seeder,
        }
    }

    // --- Read APIs ---

    pub fn version(&self) -> u64 {
        self.version.0
    }

    /// Current digest of `identity`; the zero digest if never written.
    pub fn digest_of(&self, identity: &Identity) -> Digest {
        self.digests.get(identity).copied().unwrap_or(Digest::ZERO)
    }

    pub fn seeder(&self) -> Option<Identity> {
        self.seeder
    }

    /// Entries in identity order.
    pub fn entries(&self) -> impl Iterator<Item = (&Identity, &Digest)> {
        self.digests.iter()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    // --- Authorization ---

    /// Checks `cmd` against the current state and the oracle and returns the
    /// events it would produce, in order. Never mutates.
    pub fn authorize<O: MembershipOracle + ?Sized>(
        &self,
        cmd: &Command,
        oracle: &O,
    ) -> Result<Vec<RegistryEvent>> {
        match cmd {
            Command::SelfUpdate { caller, digest } => {
                let event = self.authorize_self_update(caller, digest, oracle)?;
                Ok(alloc::vec![event])
            }
            Command::BatchUpdate { caller, identities, digests } => {
                self.authorize_batch_update(caller, identities, digests, oracle)
            }
            Command::RenounceSeeder { caller } => {
                let event = self.authorize_renounce(caller)?;
                Ok(alloc::vec![event])
            }
        }
    }

    fn authorize_self_update<O: MembershipOracle + ?Sized>(
        &self,
        caller: &Identity,
        digest: &Digest,
        oracle: &O,
    ) -> Result<RegistryEvent> {
        if !is_recognized_member(oracle, caller) {
            return Err(RegistryError::InvalidMember { identity: *caller });
        }
        Ok(RegistryEvent::DigestUpdated { identity: *caller, digest: *digest })
    }

    fn authorize_batch_update<O: MembershipOracle + ?Sized>(
        &self,
        caller: &Identity,
        identities: &[Identity],
        digests: &[Digest],
        oracle: &O,
    ) -> Result<Vec<RegistryEvent>> {
        self.ensure_seeder(caller)?;

        if identities.len() != digests.len() {
            return Err(RegistryError::LengthMismatch {
                identities: identities.len(),
                digests: digests.len(),
            });
        }

        let mut events = Vec::with_capacity(identities.len());
        for (identity, digest) in identities.iter().zip(digests.iter()) {
            if !is_recognized_member(oracle, identity) {
                return Err(RegistryError::InvalidMember { identity: *identity });
            }
            events.push(RegistryEvent::DigestUpdated { identity: *identity, digest: *digest });
        }
        Ok(events)
    }

    fn authorize_renounce(&self, caller: &Identity) -> Result<RegistryEvent> {
        self.ensure_seeder(caller)?;
        Ok(RegistryEvent::SeederRenounced { former: *caller })
    }

    pub fn ensure_seeder(&self, caller: &Identity) -> Result<()> {
        match self.seeder {
            Some(seeder) if seeder == *caller => Ok(()),
            _ => Err(RegistryError::UnauthorizedSeeder { caller: *caller }),
        }
    }

    // --- Write Logic ---

    /// Applies an already-authorized event.
    ///
    /// Renunciation is re-checked so that a log can never move the seeder
    /// anywhere but to `None`.
    pub fn apply_event(&mut self, event: &RegistryEvent) -> Result<()> {
        match event {
            RegistryEvent::DigestUpdated { identity, digest } => {
                self.digests.insert(*identity, *digest);
            }
            RegistryEvent::SeederRenounced { former } => {
                self.ensure_seeder(former)?;
                self.seeder = None;
            }
        }

        self.version = self.version.next();
        Ok(())
    }

    /// Authorizes and applies `cmd`. Returns the emitted events.
    pub fn apply<O: MembershipOracle + ?Sized>(
        &mut self,
        cmd: &Command,
        oracle: &O,
    ) -> Result<Vec<RegistryEvent>> {
        let events = self.authorize(cmd, oracle)?;
        for event in &events {
            self.apply_event(event)?;
        }
        Ok(events)
    }

    // --- Operations ---

    pub fn self_update<O: MembershipOracle + ?Sized>(
        &mut self,
        caller: Identity,
        digest: Digest,
        oracle: &O,
    ) -> Result<RegistryEvent> {
        let event = self.authorize_self_update(&caller, &digest, oracle)?;
        self.apply_event(&event)?;
        Ok(event)
    }

    pub fn batch_update<O: MembershipOracle + ?Sized>(
        &mut self,
        caller: Identity,
        identities: &[Identity],
        digests: &[Digest],
        oracle: &O,
    ) -> Result<Vec<RegistryEvent>> {
        let events = self.authorize_batch_update(&caller, identities, digests, oracle)?;
        for event in &events {
            self.apply_event(event)?;
        }
        Ok(events)
    }

    pub fn renounce_seeder(&mut self, caller: Identity) -> Result<RegistryEvent> {
        let event = self.authorize_renounce(&caller)?;
        self.apply_event(&event)?;
        Ok(event)
    }
}
