use std::sync::Arc;

use avatar_cli::commands::{cid, inspect, timeline, verify};
use avatar_kernel::membership::StaticMembership;
use avatar_kernel::snapshot::encode::encode_state;
use avatar_kernel::state::registry::RegistryState;
use avatar_kernel::types::digest::Digest;
use avatar_kernel::types::id::Identity;
use avatar_node::config::NodeConfig;
use avatar_node::engine::Engine;
use tempfile::tempdir;

const SEEDER: Identity = Identity([0x5e; 20]);
const USER: Identity = Identity([0x01; 20]);
const ORG: Identity = Identity([0x02; 20]);

/// Writes a log with three events and a checkpointed snapshot taken after
/// the first two. Returns the engine's final state hash.
fn write_fixture(dir: &std::path::Path) -> [u8; 32] {
    let cfg = NodeConfig {
        seeder: Some(SEEDER),
        event_log_path: Some(dir.join("events.log")),
        snapshot_path: Some(dir.join("registry.snap")),
        ..NodeConfig::default()
    };
    let membership = StaticMembership::new()
        .with_user(USER, Identity([0x11; 20]))
        .with_organization(ORG);

    let mut engine = Engine::new(&cfg, Arc::new(membership)).unwrap();
    engine
        .batch_update(SEEDER, vec![USER, ORG], vec![Digest([1; 32]), Digest([2; 32])])
        .unwrap();
    engine.save_snapshot().unwrap();
    engine.self_update(USER, Digest([3; 32])).unwrap();
    engine.state_hash()
}

#[test]
fn test_integration_workflow() {
    let dir = tempdir().unwrap();
    let hash = write_fixture(dir.path());
    let log = dir.path().join("events.log");

    let result = inspect::run(&log, Some(&dir.path().join("registry.snap")));
    assert!(result.is_ok());

    let result = timeline::run(&log, None);
    assert!(result.is_ok());
    let result = timeline::run(&log, Some(&USER.to_hex()));
    assert!(result.is_ok());
    assert!(timeline::run(&log, Some("0x12")).is_err());

    assert_eq!(verify::run(&log, None).unwrap(), hash);
}

#[test]
fn test_verify_detects_stale_snapshot() {
    let dir = tempdir().unwrap();
    write_fixture(dir.path());
    let log = dir.path().join("events.log");

    // Snapshot was taken before the last write.
    assert!(verify::run(&log, Some(&dir.path().join("registry.snap"))).is_err());

    let current = dir.path().join("current.snap");
    let (state, _) = avatar_node::events::event_replay::recover_from_event_log(&log).unwrap();
    std::fs::write(&current, encode_state(&state)).unwrap();
    assert!(verify::run(&log, Some(&current)).is_ok());

    let garbage = dir.path().join("garbage.snap");
    std::fs::write(&garbage, encode_state(&RegistryState::new(USER))[..10].to_vec()).unwrap();
    assert!(verify::run(&log, Some(&garbage)).is_err());
}

#[test]
fn test_missing_files() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("absent.log");

    assert!(inspect::run(&log, Some(&dir.path().join("absent.snap"))).is_ok());
    assert!(verify::run(&log, None).is_err());
    assert!(timeline::run(&log, None).is_err());
}

#[test]
fn test_cid_conversions() {
    let zero = format!("0x{}", "00".repeat(32));
    let cid = cid::digest_to_cid(&zero).unwrap();
    assert_eq!(cid, "QmNLei78zWmzUdbeRB3CiUfAizWUrbeeZh5K1rhAQKCh51");
    assert_eq!(cid::cid_to_digest(&cid).unwrap(), zero);

    assert!(cid::digest_to_cid("0xabcd").is_err());
    assert!(cid::cid_to_digest("not-a-cid").is_err());
}
