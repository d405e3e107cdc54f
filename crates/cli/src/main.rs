use avatar_cli::commands::{cid, inspect, timeline, verify};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "avatar")]
#[command(about = "Avatar Registry CLI - inspect and verify registry event logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the status of an event log and, optionally, a snapshot.
    Inspect {
        /// Path to the event log
        #[arg(long)]
        log: PathBuf,

        /// Path to a snapshot to check against the log
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// List committed changes, one row per event
    Timeline {
        log: PathBuf,

        /// Only show events for this identity
        #[arg(long, short)]
        identity: Option<String>,
    },
    /// Replay the log and compare the result with a snapshot
    Verify {
        log: PathBuf,

        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Render a hex digest as a CIDv0
    Cid { digest: String },
    /// Parse a CIDv0 back to a hex digest
    Digest { cid: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { log, snapshot } => inspect::run(&log, snapshot.as_deref()),
        Commands::Timeline { log, identity } => timeline::run(&log, identity.as_deref()),
        Commands::Verify { log, snapshot } => verify::run(&log, snapshot.as_deref()).map(|_| ()),
        Commands::Cid { digest } => {
            println!("{}", cid::digest_to_cid(&digest)?);
            Ok(())
        }
        Commands::Digest { cid: value } => {
            println!("{}", cid::cid_to_digest(&value)?);
            Ok(())
        }
    }
}
