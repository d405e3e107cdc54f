// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use avatar_kernel::encoding::cid::{from_cid_v0, to_cid_v0};
use avatar_kernel::event::RegistryEvent;
use avatar_kernel::types::digest::Digest;
use avatar_kernel::types::id::Identity;

use crate::errors::EngineError;
use crate::events::{EventProof, Notification};

/// Header naming the identity a write is made on behalf of.
pub const CALLER_HEADER: &str = "x-avatar-caller";

/// The requesting identity, taken from [`CALLER_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| EngineError::InvalidInput(format!("missing {} header", CALLER_HEADER)))?
            .to_str()
            .map_err(|_| EngineError::InvalidInput(format!("{} is not ASCII", CALLER_HEADER)))?;
        parse_identity(value).map(Caller)
    }
}

pub fn parse_identity(s: &str) -> Result<Identity, EngineError> {
    s.trim()
        .parse()
        .map_err(|e| EngineError::InvalidInput(format!("identity {:?}: {}", s, e)))
}

/// Accepts `0x`-prefixed hex or a CIDv0 (`Qm...`) string.
pub fn parse_digest(s: &str) -> Result<Digest, EngineError> {
    let s = s.trim();
    if s.starts_with("Qm") {
        return from_cid_v0(s).map_err(|e| EngineError::InvalidInput(format!("digest: {}", e)));
    }
    s.parse()
        .map_err(|e| EngineError::InvalidInput(format!("digest {:?}: {}", s, e)))
}

// --- Requests ---

#[derive(Serialize, Deserialize)]
pub struct SelfUpdateRequest {
    pub digest: String,
}

#[derive(Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    pub identities: Vec<String>,
    pub digests: Vec<String>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct SnapshotSaveRequest {
    pub path: Option<String>,
}

#[derive(Deserialize)]
pub struct EventStreamParams {
    pub start_offset: Option<u64>,
}

// --- Responses ---

#[derive(Serialize, Deserialize, Debug)]
pub struct DigestResponse {
    pub identity: String,
    pub digest: String,
    pub cid: String,
    /// False when the digest is all zeros (never written, or written as zero).
    pub is_set: bool,
}

impl DigestResponse {
    pub fn new(identity: Identity, digest: Digest) -> Self {
        Self {
            identity: identity.to_hex(),
            digest: digest.to_hex(),
            cid: to_cid_v0(&digest),
            is_set: !digest.is_zero(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventView {
    pub kind: String,
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}

impl From<&RegistryEvent> for EventView {
    fn from(event: &RegistryEvent) -> Self {
        match event {
            RegistryEvent::DigestUpdated { identity, digest } => Self {
                kind: event.event_type().to_string(),
                identity: identity.to_hex(),
                digest: Some(digest.to_hex()),
                cid: Some(to_cid_v0(digest)),
            },
            RegistryEvent::SeederRenounced { former } => Self {
                kind: event.event_type().to_string(),
                identity: former.to_hex(),
                digest: None,
                cid: None,
            },
        }
    }
}

/// One NDJSON line of the event stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub offset: u64,
    #[serde(flatten)]
    pub event: EventView,
}

impl From<&Notification> for EventRecord {
    fn from(n: &Notification) -> Self {
        Self {
            offset: n.offset,
            event: EventView::from(&n.event),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WriteResponse {
    pub events: Vec<EventView>,
    pub state_hash: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SeederResponse {
    pub seeder: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SnapshotSaveResponse {
    pub success: bool,
    pub path: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct EventProofResponse {
    pub kernel_version: u32,
    pub event_log_hash: String,
    pub final_state_hash: String,
    pub event_count: u64,
    pub snapshot_hash: Option<String>,
}

impl From<EventProof> for EventProofResponse {
    fn from(proof: EventProof) -> Self {
        Self {
            kernel_version: proof.kernel_version,
            event_log_hash: hex::encode(proof.event_log_hash),
            final_state_hash: hex::encode(proof.final_state_hash),
            event_count: proof.event_count,
            snapshot_hash: proof.snapshot_hash.map(hex::encode),
        }
    }
}
