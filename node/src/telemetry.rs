// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const DEFAULT_LOG_FILTER: &str = "avatar_node=debug,tower_http=debug";

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::error!("Failed to install Prometheus recorder: {}", e),
    }

    describe_metrics();

    // Ensure at least one metric exists on startup
    metrics::gauge!("avatar_node_up", 1.0);
}

fn describe_metrics() {
    metrics::describe_counter!("avatar_digest_updates_total", "DigestUpdated events committed");
    metrics::describe_counter!("avatar_rejections_total", "Writes rejected by authorization, by reason");
    metrics::describe_counter!("avatar_seeder_renounced_total", "Seeder renunciations committed");
    metrics::describe_histogram!("avatar_commit_duration_seconds", "Time taken to commit one write");
    metrics::describe_histogram!("avatar_replay_duration_seconds", "Time taken to replay the event log");
    metrics::describe_gauge!("avatar_snapshot_size_bytes", "Size of the last saved snapshot in bytes");
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
