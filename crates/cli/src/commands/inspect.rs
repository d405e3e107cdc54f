use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use std::path::Path;

use avatar_kernel::snapshot::decode::decode_state;
use avatar_kernel::verify::state_hash;
use avatar_node::events::event_log::{count_events, decode_log};
use avatar_node::events::event_replay::replay_entries;

pub fn run(log: &Path, snapshot: Option<&Path>) -> anyhow::Result<()> {
    println!("\nAvatar Registry Status Report");
    println!("-----------------------------");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["File", "Status", "Details"]);

    let mut replayed_hash = None;

    if log.exists() {
        let bytes = std::fs::read(log)?;
        match decode_log(&bytes) {
            Ok(decoded) => {
                let status = if decoded.torn_tail { "TORN TAIL" } else { "FOUND" };
                let mut details = format!(
                    "{} entries, {} events, {} bytes",
                    decoded.entries.len(),
                    count_events(&decoded.entries),
                    bytes.len()
                );
                match replay_entries(&decoded.entries) {
                    Ok((state, _)) => {
                        let hash = state_hash(&state);
                        replayed_hash = Some(hash);
                        details.push_str(&format!(
                            "\nseeder: {}\nidentities: {}\nstate hash: {}",
                            state.seeder().map(|s| s.to_hex()).unwrap_or_else(|| "renounced/none".to_string()),
                            state.len(),
                            hex::encode(hash)
                        ));
                    }
                    Err(e) => details.push_str(&format!("\nreplay failed: {}", e)),
                }
                table.add_row(vec!["Event Log", status, &details]);
            }
            Err(e) => {
                table.add_row(vec!["Event Log", "CORRUPT", &e.to_string()]);
            }
        }
    } else {
        table.add_row(vec!["Event Log", "MISSING", ""]);
    }

    if let Some(snapshot) = snapshot {
        if snapshot.exists() {
            let bytes = std::fs::read(snapshot)?;
            match decode_state(&bytes) {
                Ok(state) => {
                    let hash = state_hash(&state);
                    let status = match replayed_hash {
                        Some(replayed) if replayed == hash => "MATCHES LOG",
                        Some(_) => "STALE",
                        None => "FOUND",
                    };
                    let details = format!(
                        "version {}, {} identities\nstate hash: {}",
                        state.version(),
                        state.len(),
                        hex::encode(hash)
                    );
                    table.add_row(vec!["Snapshot", status, &details]);
                }
                Err(e) => {
                    table.add_row(vec!["Snapshot", "CORRUPT", &e.to_string()]);
                }
            }
        } else {
            table.add_row(vec!["Snapshot", "MISSING", ""]);
        }
    }

    println!("{table}\n");
    Ok(())
}
