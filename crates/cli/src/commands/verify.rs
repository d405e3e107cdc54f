use std::path::Path;

use anyhow::bail;
use avatar_kernel::snapshot::decode::decode_state;
use avatar_kernel::verify::state_hash;
use avatar_node::events::event_proof::compute_events_hash;
use avatar_node::events::event_replay::{read_event_log, replay_entries};

/// Replays `log`; with a snapshot, fails unless both describe the same state.
/// Returns the replayed state hash.
pub fn run(log: &Path, snapshot: Option<&Path>) -> anyhow::Result<[u8; 32]> {
    let entries = read_event_log(log)?;
    let (state, journal) = replay_entries(&entries)?;
    let replayed = state_hash(&state);

    println!("\nReplayed {} events from {}", journal.committed_height(), log.display());
    println!("Events Hash:   {}", hex::encode(compute_events_hash(journal.committed())));
    println!("State Hash:    {}", hex::encode(replayed));

    let Some(snapshot) = snapshot else {
        println!();
        return Ok(replayed);
    };

    let bytes = std::fs::read(snapshot)?;
    let decoded = match decode_state(&bytes) {
        Ok(state) => state,
        Err(e) => bail!("snapshot {} is corrupt: {}", snapshot.display(), e),
    };
    let stored = state_hash(&decoded);

    if stored == replayed {
        println!("\n✅ VERIFIED: snapshot matches the event log\n");
        Ok(replayed)
    } else {
        println!("\n❌ DIVERGED\n");
        println!("Snapshot Hash: {}", hex::encode(stored));
        bail!(
            "snapshot {} does not match event log {}",
            snapshot.display(),
            log.display()
        )
    }
}
