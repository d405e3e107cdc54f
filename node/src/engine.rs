// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use avatar_kernel::error::RegistryError;
use avatar_kernel::event::RegistryEvent;
use avatar_kernel::membership::MembershipOracle;
use avatar_kernel::snapshot::decode::decode_state;
use avatar_kernel::state::command::Command;
use avatar_kernel::state::registry::RegistryState;
use avatar_kernel::types::digest::Digest;
use avatar_kernel::types::id::Identity;
use avatar_kernel::verify::{bytes_hash, state_hash};
use tokio::sync::broadcast;

use crate::config::NodeConfig;
use crate::errors::EngineError;
use crate::events::event_proof::compute_events_hash;
use crate::events::{CommitResult, EventCommitter, EventProof, Notification};
use crate::persistence::SnapshotManager;
use crate::recovery::{bootstrap, Recovered};

pub type SharedOracle = Arc<dyn MembershipOracle + Send + Sync>;

pub struct Engine {
    committer: EventCommitter,
    oracle: SharedOracle,
    pub snapshot_path: Option<PathBuf>,
    /// Hash of the last snapshot file written or restored.
    pub current_snapshot_hash: Option<[u8; 32]>,
    /// Committed event count the last snapshot was taken at.
    snapshot_height: Option<u64>,
}

impl Engine {
    /// Builds the engine from configuration, recovering any persisted state.
    pub fn new(cfg: &NodeConfig, oracle: SharedOracle) -> Result<Self, EngineError> {
        let Recovered {
            state,
            journal,
            event_log,
        } = bootstrap(cfg)?;

        tracing::info!(
            "Registry ready: seeder={:?}, entries={}, events={}",
            state.seeder().map(|s| s.to_string()),
            state.len(),
            journal.committed_height()
        );

        Ok(Self {
            committer: EventCommitter::new(event_log, journal, state),
            oracle,
            snapshot_path: cfg.snapshot_path.clone(),
            current_snapshot_hash: None,
            snapshot_height: None,
        })
    }

    /// A registry with no durable log.
    pub fn in_memory(seeder: Option<Identity>, oracle: SharedOracle) -> Self {
        Self {
            committer: EventCommitter::new(
                None,
                Default::default(),
                RegistryState::with_seeder(seeder),
            ),
            oracle,
            snapshot_path: None,
            current_snapshot_hash: None,
            snapshot_height: None,
        }
    }

    fn reject(&self, name: &str, caller: Identity, e: RegistryError) -> EngineError {
        tracing::warn!("Rejected {} from {}: {}", name, caller, e);
        metrics::increment_counter!("avatar_rejections_total", "reason" => e.code());
        e.into()
    }

    /// Authorize, then commit. Every write goes through here.
    fn execute(&mut self, cmd: Command) -> Result<Vec<RegistryEvent>, EngineError> {
        let events = match self.committer.state().authorize(&cmd, self.oracle.as_ref()) {
            Ok(events) => events,
            Err(e) => return Err(self.reject(cmd.name(), cmd.caller(), e)),
        };

        let start = Instant::now();
        self.snapshot_renunciation(&events)?;
        match self.committer.commit(events.clone())? {
            CommitResult::Committed => {}
            CommitResult::RolledBack => {
                tracing::error!("{} from {} rolled back after authorization", cmd.name(), cmd.caller());
                return Err(EngineError::Internal);
            }
        }
        metrics::histogram!("avatar_commit_duration_seconds", start.elapsed().as_secs_f64());

        for event in &events {
            match event {
                RegistryEvent::DigestUpdated { identity, digest } => {
                    tracing::debug!("DigestUpdated {} -> {}", identity, digest);
                    metrics::increment_counter!("avatar_digest_updates_total");
                }
                RegistryEvent::SeederRenounced { former } => {
                    tracing::info!("Seeder {} renounced", former);
                    metrics::increment_counter!("avatar_seeder_renounced_total");
                }
            }
        }

        Ok(events)
    }

    /// Without an event log the snapshot is the only durable record, so a
    /// renunciation is written to it before it takes effect.
    fn snapshot_renunciation(&mut self, events: &[RegistryEvent]) -> Result<(), EngineError> {
        let renounces = events
            .iter()
            .any(|e| matches!(e, RegistryEvent::SeederRenounced { .. }));
        if !renounces || self.committer.event_log().is_some() {
            return Ok(());
        }
        let Some(path) = self.snapshot_path.clone() else {
            return Ok(());
        };

        let mut next = self.committer.state().clone();
        for event in events {
            next.apply_event(event)?;
        }
        let bytes = SnapshotManager::save(&path, &next)?;
        self.current_snapshot_hash = Some(bytes_hash(&bytes));
        self.snapshot_height = Some(self.committer.journal().committed_height() + events.len() as u64);
        tracing::info!("Renunciation snapshot written to {:?}", path);
        Ok(())
    }

    /// A recognized member sets its own digest.
    pub fn self_update(&mut self, caller: Identity, digest: Digest) -> Result<RegistryEvent, EngineError> {
        let mut events = self.execute(Command::SelfUpdate { caller, digest })?;
        events.pop().ok_or(EngineError::Internal)
    }

    /// The seeder sets digests for many members at once; all or nothing.
    pub fn batch_update(
        &mut self,
        caller: Identity,
        identities: Vec<Identity>,
        digests: Vec<Digest>,
    ) -> Result<Vec<RegistryEvent>, EngineError> {
        self.execute(Command::BatchUpdate {
            caller,
            identities,
            digests,
        })
    }

    /// Seeder check on its own, ahead of parsing a batch.
    pub fn ensure_seeder(&self, caller: Identity) -> Result<(), EngineError> {
        self.committer
            .state()
            .ensure_seeder(&caller)
            .map_err(|e| self.reject("BatchUpdate", caller, e))
    }

    pub fn renounce_seeder(&mut self, caller: Identity) -> Result<(), EngineError> {
        self.execute(Command::RenounceSeeder { caller })?;
        Ok(())
    }

    pub fn get_digest(&self, identity: &Identity) -> Digest {
        self.committer.state().digest_of(identity)
    }

    pub fn seeder(&self) -> Option<Identity> {
        self.committer.state().seeder()
    }

    pub fn state(&self) -> &RegistryState {
        self.committer.state()
    }

    pub fn state_hash(&self) -> [u8; 32] {
        state_hash(self.committer.state())
    }

    pub fn committed_events(&self) -> &[RegistryEvent] {
        self.committer.journal().committed()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.committer.subscribe()
    }

    pub fn proof(&self) -> EventProof {
        let events = self.committed_events();
        EventProof::new(
            compute_events_hash(events),
            self.state_hash(),
            events.len() as u64,
            self.current_snapshot_hash,
        )
    }

    /// True when the last snapshot already covers every committed event.
    pub fn snapshot_is_current(&self) -> bool {
        self.snapshot_height == Some(self.committer.journal().committed_height())
    }

    /// Writes a snapshot to the configured path and records a checkpoint in
    /// the event log.
    pub fn save_snapshot(&mut self) -> Result<PathBuf, EngineError> {
        let path = self
            .snapshot_path
            .clone()
            .ok_or_else(|| EngineError::InvalidInput("No snapshot path configured".to_string()))?;

        let bytes = SnapshotManager::save(&path, self.committer.state())?;
        self.current_snapshot_hash = Some(bytes_hash(&bytes));
        self.snapshot_height = Some(self.committer.journal().committed_height());
        metrics::gauge!("avatar_snapshot_size_bytes", bytes.len() as f64);

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let hash = self.state_hash();
        self.committer.checkpoint(hash, timestamp)?;

        tracing::info!("Snapshot saved to {:?} ({} bytes)", path, bytes.len());
        Ok(path)
    }

    /// Replaces the registry with a decoded snapshot.
    ///
    /// Refused once the engine has a durable log or committed events.
    pub fn restore(&mut self, data: &[u8]) -> Result<(), EngineError> {
        if self.committer.event_log().is_some() || self.committer.journal().committed_height() > 0 {
            return Err(EngineError::InvalidInput(
                "Restore is only allowed on a fresh in-memory registry".to_string(),
            ));
        }

        let state = decode_state(data)?;
        self.current_snapshot_hash = Some(bytes_hash(data));
        self.snapshot_height = Some(0);
        self.committer.replace_state(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_kernel::membership::StaticMembership;
    use avatar_kernel::snapshot::encode::encode_state;
    use tempfile::tempdir;

    const SEEDER: Identity = Identity([0x5e; 20]);
    const USER: Identity = Identity([0x01; 20]);
    const STRANGER: Identity = Identity([0x03; 20]);

    fn oracle() -> SharedOracle {
        Arc::new(StaticMembership::new().with_user(USER, Identity([0x11; 20])))
    }

    #[test]
    fn test_engine_self_update_and_reject() {
        let mut engine = Engine::in_memory(Some(SEEDER), oracle());

        engine.self_update(USER, Digest([1; 32])).unwrap();
        assert_eq!(engine.get_digest(&USER), Digest([1; 32]));

        let err = engine.self_update(STRANGER, Digest([2; 32])).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Registry(RegistryError::InvalidMember { identity }) if identity == STRANGER
        ));
        assert_eq!(engine.committed_events().len(), 1);
    }

    #[test]
    fn test_engine_persists_and_recovers() {
        let dir = tempdir().unwrap();
        let cfg = NodeConfig {
            seeder: Some(SEEDER),
            event_log_path: Some(dir.path().join("events.log")),
            snapshot_path: Some(dir.path().join("registry.snap")),
            ..NodeConfig::default()
        };

        let hash = {
            let mut engine = Engine::new(&cfg, oracle()).unwrap();
            engine
                .batch_update(SEEDER, vec![USER], vec![Digest([3; 32])])
                .unwrap();
            engine.save_snapshot().unwrap();
            engine.renounce_seeder(SEEDER).unwrap();
            engine.state_hash()
        };

        let engine = Engine::new(&cfg, oracle()).unwrap();
        assert_eq!(engine.state_hash(), hash);
        assert_eq!(engine.seeder(), None);
        assert_eq!(engine.get_digest(&USER), Digest([3; 32]));
    }

    #[test]
    fn test_in_memory_renunciation_survives_restart() {
        let dir = tempdir().unwrap();
        let cfg = NodeConfig {
            seeder: Some(SEEDER),
            snapshot_path: Some(dir.path().join("registry.snap")),
            ..NodeConfig::default()
        };

        {
            let mut engine = Engine::new(&cfg, oracle()).unwrap();
            engine.save_snapshot().unwrap();
            engine.renounce_seeder(SEEDER).unwrap();
            assert!(engine.snapshot_is_current());
        }

        let mut engine = Engine::new(&cfg, oracle()).unwrap();
        assert_eq!(engine.seeder(), None);
        assert!(matches!(
            engine.batch_update(SEEDER, vec![USER], vec![Digest([1; 32])]),
            Err(EngineError::Registry(RegistryError::UnauthorizedSeeder { .. }))
        ));
    }

    #[test]
    fn test_renunciation_refused_when_snapshot_cannot_be_written() {
        let dir = tempdir().unwrap();
        let cfg = NodeConfig {
            seeder: Some(SEEDER),
            snapshot_path: Some(dir.path().join("missing").join("registry.snap")),
            ..NodeConfig::default()
        };

        let mut engine = Engine::new(&cfg, oracle()).unwrap();
        assert!(matches!(engine.renounce_seeder(SEEDER), Err(EngineError::Io(_))));
        assert_eq!(engine.seeder(), Some(SEEDER));
        assert!(engine.committed_events().is_empty());
    }

    #[test]
    fn test_snapshot_is_current_tracks_commits() {
        let dir = tempdir().unwrap();
        let cfg = NodeConfig {
            seeder: Some(SEEDER),
            event_log_path: Some(dir.path().join("events.log")),
            snapshot_path: Some(dir.path().join("registry.snap")),
            ..NodeConfig::default()
        };

        let mut engine = Engine::new(&cfg, oracle()).unwrap();
        assert!(!engine.snapshot_is_current());
        engine.save_snapshot().unwrap();
        assert!(engine.snapshot_is_current());

        engine.self_update(USER, Digest([4; 32])).unwrap();
        assert!(!engine.snapshot_is_current());
        engine.save_snapshot().unwrap();
        assert!(engine.snapshot_is_current());
    }

    #[test]
    fn test_seeder_check_alone() {
        let engine = Engine::in_memory(Some(SEEDER), oracle());
        assert!(engine.ensure_seeder(SEEDER).is_ok());
        assert!(matches!(
            engine.ensure_seeder(USER),
            Err(EngineError::Registry(RegistryError::UnauthorizedSeeder { .. }))
        ));
    }

    #[test]
    fn test_proof_tracks_history() {
        let mut a = Engine::in_memory(Some(SEEDER), oracle());
        let mut b = Engine::in_memory(Some(SEEDER), oracle());
        a.self_update(USER, Digest([1; 32])).unwrap();
        b.self_update(USER, Digest([1; 32])).unwrap();
        assert!(a.proof().matches(&b.proof()));

        b.self_update(USER, Digest([1; 32])).unwrap();
        assert!(!a.proof().matches(&b.proof()));
    }

    #[test]
    fn test_restore_only_on_fresh_engine() {
        let mut source = RegistryState::new(SEEDER);
        source
            .apply_event(&RegistryEvent::DigestUpdated { identity: USER, digest: Digest([5; 32]) })
            .unwrap();
        let bytes = encode_state(&source);

        let mut engine = Engine::in_memory(None, oracle());
        engine.restore(&bytes).unwrap();
        assert_eq!(engine.state(), &source);

        engine.self_update(USER, Digest([6; 32])).unwrap();
        assert!(matches!(engine.restore(&bytes), Err(EngineError::InvalidInput(_))));
    }
}
