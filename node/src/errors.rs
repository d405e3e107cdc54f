// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use avatar_kernel::error::RegistryError;
use avatar_kernel::snapshot::SnapshotError;

use crate::events::event_commit::CommitError;
use crate::events::event_log::EventLogError;
use crate::events::event_replay::ReplayError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Registry(RegistryError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Membership file error: {0}")]
    Membership(String),
    #[error("Snapshot error: {0}")]
    Snapshot(SnapshotError),
    #[error(transparent)]
    EventLog(#[from] EventLogError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal server error")]
    Internal,
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Registry(r) => r.code(),
            EngineError::InvalidInput(_) => "InvalidInput",
            EngineError::Membership(_) => "Membership",
            EngineError::Snapshot(_) => "Snapshot",
            EngineError::EventLog(_) => "EventLog",
            EngineError::Commit(_) => "Commit",
            EngineError::Replay(_) => "Replay",
            EngineError::Io(_) => "Io",
            EngineError::Internal => "Internal",
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::Registry(r) => match r {
                RegistryError::InvalidMember { .. } => StatusCode::FORBIDDEN,
                RegistryError::UnauthorizedSeeder { .. } => StatusCode::FORBIDDEN,
                RegistryError::LengthMismatch { .. } => StatusCode::BAD_REQUEST,
            },
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            // Persistence details stay in the logs.
            EngineError::EventLog(_)
            | EngineError::Commit(_)
            | EngineError::Replay(_)
            | EngineError::Io(_) => {
                tracing::error!("Request failed: {}", self);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

impl From<RegistryError> for EngineError {
    fn from(e: RegistryError) -> Self {
        EngineError::Registry(e)
    }
}

impl From<SnapshotError> for EngineError {
    fn from(e: SnapshotError) -> Self {
        EngineError::Snapshot(e)
    }
}
