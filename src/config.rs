//! Configuration for the session manager and the default hashing provider.
//! Hosts may override the defaults from the environment (`PRIVGUARD_*`) or
//! build the structs directly.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{PrivilegeError, PrivilegeResult};

pub const ENV_MIN_CREDENTIAL_LEN: &str = "PRIVGUARD_MIN_CREDENTIAL_LEN";
pub const ENV_SESSION_TTL_SECS: &str = "PRIVGUARD_SESSION_TTL_SECS";
pub const ENV_REVOKE_ON_REAUTH: &str = "PRIVGUARD_REVOKE_ON_REAUTH";
pub const ENV_MAX_SESSIONS: &str = "PRIVGUARD_MAX_SESSIONS_PER_PRINCIPAL";
pub const ENV_HASH_SALT: &str = "PRIVGUARD_HASH_SALT";
pub const ENV_HASH_M_COST: &str = "PRIVGUARD_HASH_M_COST";
pub const ENV_HASH_T_COST: &str = "PRIVGUARD_HASH_T_COST";
pub const ENV_HASH_P_COST: &str = "PRIVGUARD_HASH_P_COST";

/// Session lifecycle settings. By default a session lives until explicit logout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Names and secrets shorter than this (in characters) are a validation fault.
    pub min_credential_len: usize,
    /// `None` keeps sessions until explicit logout.
    #[serde(default)]
    pub session_ttl: Option<Duration>,
    /// Drop a principal's existing sessions when it authenticates again.
    #[serde(default)]
    pub revoke_on_reauthenticate: bool,
    /// Evict the principal's oldest session once this many are active.
    #[serde(default)]
    pub max_sessions_per_principal: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_credential_len: 3,
            session_ttl: None,
            revoke_on_reauthenticate: false,
            max_sessions_per_principal: None,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> PrivilegeResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PrivilegeResult<Self> {
        let mut cfg = Self::default();
        if let Some(n) = parse_opt::<usize>(&lookup, ENV_MIN_CREDENTIAL_LEN)? { cfg.min_credential_len = n; }
        if let Some(secs) = parse_opt::<u64>(&lookup, ENV_SESSION_TTL_SECS)? {
            cfg.session_ttl = if secs == 0 { None } else { Some(Duration::from_secs(secs)) };
        }
        if let Some(b) = parse_opt::<bool>(&lookup, ENV_REVOKE_ON_REAUTH)? { cfg.revoke_on_reauthenticate = b; }
        if let Some(n) = parse_opt::<usize>(&lookup, ENV_MAX_SESSIONS)? {
            cfg.max_sessions_per_principal = if n == 0 { None } else { Some(n) };
        }
        Ok(cfg)
    }
}

/// Parameters for [`crate::hashing::Argon2Provider`].
///
/// The salt is deployment-wide so that a secret always hashes to the same
/// digest; keep it out of source control.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HashingConfig {
    pub salt: Vec<u8>,
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl std::fmt::Debug for HashingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingConfig")
            .field("salt_len", &self.salt.len())
            .field("m_cost", &self.m_cost)
            .field("t_cost", &self.t_cost)
            .field("p_cost", &self.p_cost)
            .finish()
    }
}

impl HashingConfig {
    pub fn new(salt: impl Into<Vec<u8>>) -> Self {
        Self {
            salt: salt.into(),
            m_cost: argon2::Params::DEFAULT_M_COST,
            t_cost: argon2::Params::DEFAULT_T_COST,
            p_cost: argon2::Params::DEFAULT_P_COST,
        }
    }

    pub fn from_env() -> PrivilegeResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// The salt (standard base64) is mandatory; cost parameters are optional.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PrivilegeResult<Self> {
        let Some(raw) = lookup(ENV_HASH_SALT) else {
            return Err(PrivilegeError::internal(
                "missing_hash_salt".to_string(),
                format!("{} is not set", ENV_HASH_SALT),
            ));
        };
        let salt = base64::engine::general_purpose::STANDARD
            .decode(raw.trim())
            .map_err(|e| PrivilegeError::internal("bad_hash_salt".to_string(), format!("{}: {}", ENV_HASH_SALT, e)))?;
        let mut cfg = Self::new(salt);
        if let Some(m) = parse_opt::<u32>(&lookup, ENV_HASH_M_COST)? { cfg.m_cost = m; }
        if let Some(t) = parse_opt::<u32>(&lookup, ENV_HASH_T_COST)? { cfg.t_cost = t; }
        if let Some(p) = parse_opt::<u32>(&lookup, ENV_HASH_P_COST)? { cfg.p_cost = p; }
        Ok(cfg)
    }
}

fn parse_opt<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> PrivilegeResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => v.trim().parse::<T>().map(Some).map_err(|e| {
            PrivilegeError::internal("bad_config_value".to_string(), format!("{}={:?}: {}", key, v, e))
        }),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
