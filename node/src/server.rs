// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, Request as AxumRequest, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

use crate::api::*;
use crate::engine::Engine;
use crate::errors::EngineError;
use crate::events::Notification;

pub type SharedEngine = Arc<RwLock<Engine>>;

async fn auth_guard(
    State(token): State<Arc<String>>,
    req: AxumRequest,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == token.as_str() => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Builds the HTTP surface.
///
/// Write routes act on the `x-avatar-caller` header, so they are mounted
/// only behind a bearer token or with `trust_caller_header` set.
pub fn build_router(
    state: SharedEngine,
    auth_token: Option<String>,
    trust_caller_header: bool,
) -> Router {
    let mut app = Router::new()
        // Registry v1
        .route("/v1/avatars/:identity", get(get_digest))
        .route("/v1/seeder", get(get_seeder));

    if auth_token.is_some() || trust_caller_header {
        app = app
            .route("/v1/digest", post(self_update))
            .route("/v1/seeder/batch", post(batch_update))
            .route("/v1/seeder/renounce", post(renounce_seeder));
    } else {
        tracing::warn!(
            "Write routes disabled: set AVATAR_AUTH_TOKEN or AVATAR_TRUST_CALLER_HEADER=true"
        );
    }

    let mut app = app
        // Change notifications
        .route("/v1/events", get(get_events))
        // Proofs and snapshots
        .route("/v1/proof/state", get(get_proof))
        .route("/v1/snapshot/save", post(snapshot_save))
        .with_state(state);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        app = app.layer(from_fn_with_state(Arc::new(token), auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    // Metrics stay reachable for scrapers without a token.
    app.route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
}

async fn get_digest(
    State(state): State<SharedEngine>,
    Path(identity): Path<String>,
) -> Result<Json<DigestResponse>, EngineError> {
    let identity = parse_identity(&identity)?;
    let engine = state.read().await;
    Ok(Json(DigestResponse::new(identity, engine.get_digest(&identity))))
}

async fn self_update(
    State(state): State<SharedEngine>,
    Caller(caller): Caller,
    Json(payload): Json<SelfUpdateRequest>,
) -> Result<Json<WriteResponse>, EngineError> {
    let digest = parse_digest(&payload.digest)?;

    let mut engine = state.write().await;
    let event = engine.self_update(caller, digest)?;
    Ok(Json(WriteResponse {
        events: vec![EventView::from(&event)],
        state_hash: hex::encode(engine.state_hash()),
    }))
}

async fn batch_update(
    State(state): State<SharedEngine>,
    Caller(caller): Caller,
    Json(payload): Json<BatchUpdateRequest>,
) -> Result<Json<WriteResponse>, EngineError> {
    let mut engine = state.write().await;
    engine.ensure_seeder(caller)?;

    let identities = payload
        .identities
        .iter()
        .map(|s| parse_identity(s))
        .collect::<Result<Vec<_>, _>>()?;
    let digests = payload
        .digests
        .iter()
        .map(|s| parse_digest(s))
        .collect::<Result<Vec<_>, _>>()?;

    let events = engine.batch_update(caller, identities, digests)?;
    Ok(Json(WriteResponse {
        events: events.iter().map(EventView::from).collect(),
        state_hash: hex::encode(engine.state_hash()),
    }))
}

async fn renounce_seeder(
    State(state): State<SharedEngine>,
    Caller(caller): Caller,
) -> Result<Json<SeederResponse>, EngineError> {
    let mut engine = state.write().await;
    engine.renounce_seeder(caller)?;
    Ok(Json(SeederResponse {
        seeder: engine.seeder().map(|s| s.to_hex()),
    }))
}

async fn get_seeder(State(state): State<SharedEngine>) -> Json<SeederResponse> {
    let engine = state.read().await;
    Json(SeederResponse {
        seeder: engine.seeder().map(|s| s.to_hex()),
    })
}

/// NDJSON stream: committed events from `start_offset`, then live ones.
async fn get_events(
    State(state): State<SharedEngine>,
    Query(params): Query<EventStreamParams>,
) -> Result<Body, EngineError> {
    let start_offset = params.start_offset.unwrap_or(0);

    // History and subscription under one guard: no gap, no duplicates.
    let (history, rx) = {
        let engine = state.read().await;
        let history: Vec<Notification> = engine
            .committed_events()
            .iter()
            .enumerate()
            .skip(start_offset as usize)
            .map(|(offset, event)| Notification {
                offset: offset as u64,
                event: *event,
            })
            .collect();
        (history, engine.subscribe())
    };

    let live = BroadcastStream::new(rx).filter_map(move |res| async move {
        match res {
            Ok(n) if n.offset >= start_offset => Some(n),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Event subscriber lagged: {}", e);
                None
            }
        }
    });

    let body_stream = futures::stream::iter(history).chain(live).map(|n| {
        serde_json::to_string(&EventRecord::from(&n))
            .map(|mut line| {
                line.push('\n');
                line
            })
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    });

    Ok(Body::from_stream(body_stream))
}

async fn get_proof(State(state): State<SharedEngine>) -> Json<EventProofResponse> {
    let engine = state.read().await;
    Json(engine.proof().into())
}

async fn snapshot_save(
    State(state): State<SharedEngine>,
    req: Option<Json<SnapshotSaveRequest>>,
) -> Result<Json<SnapshotSaveResponse>, EngineError> {
    let req = req.map(|Json(r)| r).unwrap_or_default();

    let mut engine = state.write().await;
    // Only the configured snapshot file may be written.
    if let Some(requested) = req.path {
        if engine.snapshot_path.as_deref() != Some(std::path::Path::new(&requested)) {
            return Err(EngineError::InvalidInput(format!(
                "snapshot path {:?} is not the configured snapshot path",
                requested
            )));
        }
    }
    let used_path = engine.save_snapshot()?;

    Ok(Json(SnapshotSaveResponse {
        success: true,
        path: used_path.to_string_lossy().to_string(),
    }))
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
