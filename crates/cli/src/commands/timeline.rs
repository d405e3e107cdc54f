use std::path::Path;

use anyhow::anyhow;
use avatar_kernel::encoding::cid::to_cid_v0;
use avatar_kernel::event::RegistryEvent;
use avatar_kernel::types::id::Identity;
use avatar_node::events::event_replay::read_event_log;
use avatar_node::events::LogEntry;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

pub fn run(log: &Path, identity: Option<&str>) -> anyhow::Result<()> {
    let filter: Option<Identity> = identity
        .map(|s| s.parse::<Identity>().map_err(|e| anyhow!("invalid identity {:?}: {}", s, e)))
        .transpose()?;

    let entries = read_event_log(log)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Offset", "Event", "Identity", "Digest (CIDv0)"]);

    let mut offset = 0u64;
    for entry in &entries {
        match entry {
            LogEntry::Genesis { seeder } => {
                if filter.is_none() {
                    let seeder = seeder.map(|s| s.to_hex()).unwrap_or_else(|| "-".to_string());
                    table.add_row(vec!["-".to_string(), "Genesis".to_string(), seeder, String::new()]);
                }
            }
            LogEntry::Commit { events } => {
                for event in events {
                    if matches_filter(event, filter.as_ref()) {
                        table.add_row(event_row(offset, event));
                    }
                    offset += 1;
                }
            }
            LogEntry::Checkpoint { event_count, timestamp, .. } => {
                if filter.is_none() {
                    let ts = chrono::DateTime::from_timestamp(*timestamp as i64, 0)
                        .unwrap_or_default()
                        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
                    table.add_row(vec![
                        "-".to_string(),
                        format!("Checkpoint @ {}", event_count),
                        String::new(),
                        ts,
                    ]);
                }
            }
        }
    }

    println!("\nEvent Timeline\n");
    println!("{table}\n");

    Ok(())
}

fn matches_filter(event: &RegistryEvent, filter: Option<&Identity>) -> bool {
    match (event, filter) {
        (_, None) => true,
        (RegistryEvent::DigestUpdated { identity, .. }, Some(f)) => identity == f,
        (RegistryEvent::SeederRenounced { former }, Some(f)) => former == f,
    }
}

fn event_row(offset: u64, event: &RegistryEvent) -> Vec<String> {
    match event {
        RegistryEvent::DigestUpdated { identity, digest } => vec![
            offset.to_string(),
            event.event_type().to_string(),
            identity.to_hex(),
            to_cid_v0(digest),
        ],
        RegistryEvent::SeederRenounced { former } => vec![
            offset.to_string(),
            event.event_type().to_string(),
            former.to_hex(),
            String::new(),
        ],
    }
}
