// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Proof - Audit Trail Generation
//!
//! Same committed events → same proof, on any machine.

use avatar_kernel::event::RegistryEvent;
use serde::{Deserialize, Serialize};

pub const KERNEL_VERSION: u32 = 1;

/// Event-sourced proof of registry state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventProof {
    pub kernel_version: u32,

    /// BLAKE3 over the committed events in order.
    pub event_log_hash: [u8; 32],

    /// Deterministic hash of the registry state.
    pub final_state_hash: [u8; 32],

    pub event_count: u64,

    /// Hash of the last saved snapshot file, if any.
    pub snapshot_hash: Option<[u8; 32]>,
}

impl EventProof {
    pub fn new(
        event_log_hash: [u8; 32],
        final_state_hash: [u8; 32],
        event_count: u64,
        snapshot_hash: Option<[u8; 32]>,
    ) -> Self {
        Self {
            kernel_version: KERNEL_VERSION,
            event_log_hash,
            final_state_hash,
            event_count,
            snapshot_hash,
        }
    }

    /// Verify two proofs describe the same history.
    ///
    /// Note: snapshot_hash may differ (snapshots are optimization)
    pub fn matches(&self, other: &EventProof) -> bool {
        self.kernel_version == other.kernel_version
            && self.event_log_hash == other.event_log_hash
            && self.final_state_hash == other.final_state_hash
            && self.event_count == other.event_count
    }
}

/// BLAKE3 over each event's canonical bytes, length-prefixed.
pub fn compute_events_hash(events: &[RegistryEvent]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(events.len() as u64).to_le_bytes());
    for event in events {
        let bytes = event.to_canonical_bytes();
        hasher.update(&(bytes.len() as u32).to_le_bytes());
        hasher.update(&bytes);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_kernel::types::digest::Digest;
    use avatar_kernel::types::id::Identity;

    fn update(n: u8) -> RegistryEvent {
        RegistryEvent::DigestUpdated {
            identity: Identity([n; 20]),
            digest: Digest([n; 32]),
        }
    }

    #[test]
    fn test_events_hash_is_order_sensitive() {
        let a = compute_events_hash(&[update(1), update(2)]);
        let b = compute_events_hash(&[update(2), update(1)]);
        assert_ne!(a, b);
        assert_eq!(a, compute_events_hash(&[update(1), update(2)]));
    }

    #[test]
    fn test_proof_matches_ignores_snapshot() {
        let a = EventProof::new([1; 32], [2; 32], 3, None);
        let b = EventProof::new([1; 32], [2; 32], 3, Some([9; 32]));
        assert!(a.matches(&b));

        let c = EventProof::new([1; 32], [2; 32], 4, None);
        assert!(!a.matches(&c));
    }
}
