// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;

use avatar_kernel::types::id::Identity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    /// Initial seeder. Ignored when an existing event log is recovered.
    pub seeder: Option<Identity>,
    /// JSON membership table; empty membership when unset.
    pub membership_path: Option<PathBuf>,
    /// Append-only event log; the registry is in-memory only when unset.
    pub event_log_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    pub auto_snapshot_interval_secs: Option<u64>,
    /// Bearer token required on every request when set.
    pub auth_token: Option<String>,
    /// Accept the caller header without a bearer token. Write routes are
    /// not mounted when this is false and no token is set.
    pub trust_caller_header: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            seeder: None,
            membership_path: None,
            event_log_path: None,
            snapshot_path: None,
            auto_snapshot_interval_secs: None,
            auth_token: None,
            trust_caller_header: false,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `AVATAR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut cfg = NodeConfig::default();

        if let Some(v) = lookup("AVATAR_BIND_ADDR") {
            cfg.bind_addr = parse("AVATAR_BIND_ADDR", v)?;
        }
        if let Some(v) = lookup("AVATAR_SEEDER") {
            cfg.seeder = Some(parse("AVATAR_SEEDER", v)?);
        }
        if let Some(v) = lookup("AVATAR_MEMBERSHIP_PATH") {
            cfg.membership_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("AVATAR_EVENT_LOG") {
            cfg.event_log_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("AVATAR_SNAPSHOT_PATH") {
            cfg.snapshot_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("AVATAR_SNAPSHOT_INTERVAL_SECS") {
            cfg.auto_snapshot_interval_secs = Some(parse("AVATAR_SNAPSHOT_INTERVAL_SECS", v)?);
        }
        if let Some(v) = lookup("AVATAR_AUTH_TOKEN") {
            if !v.is_empty() {
                cfg.auth_token = Some(v);
            }
        }
        if let Some(v) = lookup("AVATAR_TRUST_CALLER_HEADER") {
            cfg.trust_caller_header = parse("AVATAR_TRUST_CALLER_HEADER", v)?;
        }

        Ok(cfg)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
