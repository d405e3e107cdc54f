use std::sync::Arc;

use avatar_kernel::membership::StaticMembership;
use avatar_kernel::types::id::Identity;
use avatar_node::api::{
    DigestResponse, SeederResponse, SnapshotSaveResponse, WriteResponse, CALLER_HEADER,
};
use avatar_node::engine::Engine;
use avatar_node::server::build_router;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower::ServiceExt; // for oneshot

const SEEDER: Identity = Identity([0x5e; 20]);
const USER: Identity = Identity([0x01; 20]);
const ORG: Identity = Identity([0x02; 20]);
const STRANGER: Identity = Identity([0x03; 20]);

fn digest_hex(b: u8) -> String {
    format!("0x{}", hex::encode([b; 32]))
}

fn engine() -> Engine {
    let membership = StaticMembership::new()
        .with_user(USER, Identity([0x11; 20]))
        .with_organization(ORG);
    Engine::in_memory(Some(SEEDER), Arc::new(membership))
}

fn app_with_token(token: Option<&str>) -> Router {
    build_router(Arc::new(RwLock::new(engine())), token.map(String::from), false)
}

fn app() -> Router {
    build_router(Arc::new(RwLock::new(engine())), None, true)
}

fn post(uri: &str, caller: Option<Identity>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(caller) = caller {
        builder = builder.header(CALLER_HEADER, caller.to_hex());
    }
    builder.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn digest_of(app: &Router, identity: Identity) -> DigestResponse {
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/avatars/{}", identity.to_hex())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn test_user_self_update() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post("/v1/digest", Some(USER), json!({ "digest": digest_hex(0xab) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let write: WriteResponse = body_json(response).await;
    assert_eq!(write.events.len(), 1);
    assert_eq!(write.events[0].kind, "DigestUpdated");

    let view = digest_of(&app, USER).await;
    assert_eq!(view.digest, digest_hex(0xab));
    assert!(view.is_set);
}

#[tokio::test]
async fn test_organization_self_update() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post("/v1/digest", Some(ORG), json!({ "digest": digest_hex(0xcd) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(digest_of(&app, ORG).await.digest, digest_hex(0xcd));
}

#[tokio::test]
async fn test_unrecognized_self_update_rejected() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post("/v1/digest", Some(STRANGER), json!({ "digest": digest_hex(0xef) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "InvalidMember");

    let view = digest_of(&app, STRANGER).await;
    assert_eq!(view.digest, digest_hex(0));
    assert!(!view.is_set);
}

#[tokio::test]
async fn test_seeder_batch_update() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post(
            "/v1/seeder/batch",
            Some(SEEDER),
            json!({
                "identities": [USER.to_hex(), ORG.to_hex()],
                "digests": [digest_hex(1), digest_hex(2)],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let write: WriteResponse = body_json(response).await;
    let order: Vec<&str> = write.events.iter().map(|e| e.identity.as_str()).collect();
    assert_eq!(order, vec![USER.to_hex(), ORG.to_hex()]);

    assert_eq!(digest_of(&app, USER).await.digest, digest_hex(1));
    assert_eq!(digest_of(&app, ORG).await.digest, digest_hex(2));
}

#[tokio::test]
async fn test_batch_with_unrecognized_member_is_atomic() {
    let app = app();

    app.clone()
        .oneshot(post("/v1/digest", Some(USER), json!({ "digest": digest_hex(9) })))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post(
            "/v1/seeder/batch",
            Some(SEEDER),
            json!({
                "identities": [USER.to_hex(), STRANGER.to_hex()],
                "digests": [digest_hex(1), digest_hex(2)],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "InvalidMember");

    assert_eq!(digest_of(&app, USER).await.digest, digest_hex(9));
    assert_eq!(digest_of(&app, STRANGER).await.digest, digest_hex(0));
}

#[tokio::test]
async fn test_renounced_seeder_cannot_batch() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post("/v1/seeder/renounce", Some(SEEDER), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let seeder: SeederResponse = body_json(response).await;
    assert!(seeder.seeder.is_none());

    let response = app
        .clone()
        .oneshot(post(
            "/v1/seeder/batch",
            Some(SEEDER),
            json!({ "identities": [USER.to_hex()], "digests": [digest_hex(3)] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "UnauthorizedSeeder");

    let response = app.clone().oneshot(get("/v1/seeder")).await.unwrap();
    let seeder: SeederResponse = body_json(response).await;
    assert!(seeder.seeder.is_none());
}

#[tokio::test]
async fn test_batch_length_mismatch() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post(
            "/v1/seeder/batch",
            Some(SEEDER),
            json!({ "identities": [USER.to_hex(), ORG.to_hex()], "digests": [digest_hex(1)] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "LengthMismatch");
    assert_eq!(digest_of(&app, USER).await.digest, digest_hex(0));
}

#[tokio::test]
async fn test_non_seeder_batch_rejected_before_length_check() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post(
            "/v1/seeder/batch",
            Some(USER),
            json!({ "identities": [USER.to_hex()], "digests": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "UnauthorizedSeeder");
}

#[tokio::test]
async fn test_non_seeder_malformed_batch_is_unauthorized() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post(
            "/v1/seeder/batch",
            Some(USER),
            json!({ "identities": ["not-hex"], "digests": ["0x12"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "UnauthorizedSeeder");
}

#[tokio::test]
async fn test_caller_header_untrusted_without_token() {
    let app = app_with_token(None);

    // Claims to be the seeder; write routes are not mounted.
    let response = app
        .clone()
        .oneshot(post("/v1/seeder/renounce", Some(SEEDER), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post("/v1/digest", Some(USER), json!({ "digest": digest_hex(1) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(get("/v1/seeder")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let seeder: SeederResponse = body_json(response).await;
    assert_eq!(seeder.seeder, Some(SEEDER.to_hex()));
}

#[tokio::test]
async fn test_snapshot_save_rejects_foreign_path() {
    let dir = tempfile::tempdir().unwrap();
    let configured = dir.path().join("registry.snap");
    let foreign = dir.path().join("elsewhere.snap");

    let mut engine = engine();
    engine.snapshot_path = Some(configured.clone());
    let app = build_router(Arc::new(RwLock::new(engine)), None, true);

    let response = app
        .clone()
        .oneshot(post(
            "/v1/snapshot/save",
            None,
            json!({ "path": foreign.to_string_lossy() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!foreign.exists());
    assert!(!foreign.with_extension("tmp").exists());

    let response = app
        .clone()
        .oneshot(post("/v1/snapshot/save", None, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved: SnapshotSaveResponse = body_json(response).await;
    assert_eq!(saved.path, configured.to_string_lossy());
    assert!(configured.exists());
}

#[tokio::test]
async fn test_oversized_cid_rejected() {
    let app = app();
    let huge = format!("Qm{}", "z".repeat(100_000));

    let response = app
        .clone()
        .oneshot(post("/v1/digest", Some(USER), json!({ "digest": huge })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "InvalidInput");
}

#[tokio::test]
async fn test_malformed_requests() {
    let app = app();

    // No caller header.
    let response = app
        .clone()
        .oneshot(post("/v1/digest", None, json!({ "digest": digest_hex(1) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Short digest.
    let response = app
        .clone()
        .oneshot(post("/v1/digest", Some(USER), json!({ "digest": "0xabcd" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: Value = body_json(response).await;
    assert_eq!(err["code"], "InvalidInput");

    // Bad identity in the path.
    let response = app.clone().oneshot(get("/v1/avatars/not-hex")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_digest_accepts_cid() {
    let app = app();
    let cid = avatar_kernel::encoding::cid::to_cid_v0(&avatar_kernel::types::digest::Digest([7; 32]));

    let response = app
        .clone()
        .oneshot(post("/v1/digest", Some(USER), json!({ "digest": cid })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let view = digest_of(&app, USER).await;
    assert_eq!(view.digest, digest_hex(7));
    assert_eq!(view.cid, cid);
}

#[tokio::test]
async fn test_auth_token_required() {
    let app = app_with_token(Some("secret"));

    let response = app.clone().oneshot(get("/v1/seeder")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/seeder")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_proof_endpoint_tracks_writes() {
    let app = app();

    let response = app.clone().oneshot(get("/v1/proof/state")).await.unwrap();
    let before: Value = body_json(response).await;
    assert_eq!(before["event_count"], 0);

    app.clone()
        .oneshot(post("/v1/digest", Some(USER), json!({ "digest": digest_hex(1) })))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/v1/proof/state")).await.unwrap();
    let after: Value = body_json(response).await;
    assert_eq!(after["event_count"], 1);
    assert_ne!(before["final_state_hash"], after["final_state_hash"]);
}
