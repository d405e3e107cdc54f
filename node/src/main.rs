// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use avatar_kernel::membership::StaticMembership;
use avatar_node::config::NodeConfig;
use avatar_node::engine::{Engine, SharedOracle};
use avatar_node::membership::load_membership;
use avatar_node::server::{build_router, SharedEngine};
use avatar_node::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() {
    init_telemetry();

    if let Err(e) = run().await {
        tracing::error!("avatar-node failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing Avatar Node with config: {:?}", cfg);

    let oracle: SharedOracle = match &cfg.membership_path {
        Some(path) => Arc::new(load_membership(path)?),
        None => {
            tracing::warn!("No membership file configured: no identity is a recognized member");
            Arc::new(StaticMembership::new())
        }
    };

    let engine = Engine::new(&cfg, oracle)?;
    let shared_state: SharedEngine = Arc::new(RwLock::new(engine));

    if let (Some(_), Some(secs)) = (&cfg.snapshot_path, cfg.auto_snapshot_interval_secs) {
        let state_clone = shared_state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(secs.max(1)));
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut engine = state_clone.write().await;
                if engine.snapshot_is_current() {
                    continue;
                }
                tracing::debug!("Auto-snapshotting...");
                if let Err(e) = engine.save_snapshot() {
                    tracing::error!("Snapshot failed: {}", e);
                }
            }
        });
    }

    let app = build_router(shared_state, cfg.auth_token.clone(), cfg.trust_caller_header);

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
