// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use avatar_kernel::membership::StaticMembership;

use crate::errors::EngineError;

/// Loads a membership table of the form
/// `{"users": {"0x<id>": "0x<token>"}, "organizations": ["0x<id>"]}`.
pub fn load_membership(path: &Path) -> Result<StaticMembership, EngineError> {
    let bytes = std::fs::read(path)
        .map_err(|e| EngineError::Membership(format!("{}: {}", path.display(), e)))?;
    let membership: StaticMembership = serde_json::from_slice(&bytes)
        .map_err(|e| EngineError::Membership(format!("{}: {}", path.display(), e)))?;

    tracing::info!(
        "Loaded membership from {:?}: {} entries",
        path,
        membership.len()
    );
    Ok(membership)
}
