//! Bulk import of principals, roles and privileges from a JSON model file.
//!
//! ```json
//! {
//!   "privileges": [{ "name": "export", "policy": "DefaultPrivilege",
//!                    "all_allowed": false, "deny": ["reports-confidential"], "allow": ["reports"] }],
//!   "roles":      [{ "name": "reporting", "privileges": ["export"] }],
//!   "principals": [{ "name": "admin", "password_hash": "$argon2id$...", "state": "ENABLED",
//!                    "roles": ["reporting"], "locale": "en" }]
//! }
//! ```
//!
//! The whole model is validated before anything is built: empty list entries,
//! duplicate names and dangling references are all rejected.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::{MemoryStore, MutableCredentialStore};
use crate::error::PrivilegeError;
use crate::model::{Principal, PrincipalRep, PrivilegeDef, Role};
use crate::policy::DEFAULT_POLICY;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse store model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid store model: {0}")]
    Invalid(#[from] PrivilegeError),
    #[error("{kind} {name} is defined more than once")]
    Duplicate { kind: &'static str, name: String },
    #[error("{kind} {name} references undefined {target} {missing}")]
    Dangling {
        kind: &'static str,
        name: String,
        target: &'static str,
        missing: String,
    },
}

impl From<LoadError> for PrivilegeError {
    fn from(err: LoadError) -> Self {
        PrivilegeError::internal("store_load_failed".to_string(), err.to_string())
    }
}

fn default_policy() -> String { DEFAULT_POLICY.to_string() }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivilegeRecord {
    pub name: String,
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default)]
    pub all_allowed: bool,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub allow: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRecord {
    pub name: String,
    #[serde(default)]
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrincipalRecord {
    #[serde(flatten)]
    pub rep: PrincipalRep,
    #[serde(default)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreModel {
    #[serde(default)]
    pub privileges: Vec<PrivilegeRecord>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub principals: Vec<PrincipalRecord>,
}

impl StoreModel {
    /// Validate the model and build a populated [`MemoryStore`].
    pub fn build(self) -> Result<MemoryStore, LoadError> {
        let mut privileges = Vec::with_capacity(self.privileges.len());
        let mut seen = HashSet::new();
        for p in self.privileges.into_iter() {
            if !seen.insert(p.name.clone()) {
                return Err(LoadError::Duplicate { kind: "privilege", name: p.name });
            }
            privileges.push(PrivilegeDef::new(p.name, p.policy, p.all_allowed, p.deny, p.allow)?);
        }
        let privilege_names = seen;

        let mut roles = Vec::with_capacity(self.roles.len());
        let mut seen = HashSet::new();
        for r in self.roles.into_iter() {
            if !seen.insert(r.name.clone()) {
                return Err(LoadError::Duplicate { kind: "role", name: r.name });
            }
            let role = Role::new(r.name, r.privileges)?;
            if let Some(missing) = role.privilege_names().find(|p| !privilege_names.contains(*p)) {
                return Err(LoadError::Dangling {
                    kind: "role",
                    name: role.name().to_string(),
                    target: "privilege",
                    missing: missing.to_string(),
                });
            }
            roles.push(role);
        }
        let role_names = seen;

        let mut principals = Vec::with_capacity(self.principals.len());
        let mut seen = HashSet::new();
        for u in self.principals.into_iter() {
            if !seen.insert(u.rep.name.clone()) {
                return Err(LoadError::Duplicate { kind: "principal", name: u.rep.name });
            }
            let principal = Principal::new(u.rep, u.password_hash)?;
            if let Some(missing) = principal.roles().iter().find(|r| !role_names.contains(r.as_str())) {
                return Err(LoadError::Dangling {
                    kind: "principal",
                    name: principal.name().to_string(),
                    target: "role",
                    missing: missing.clone(),
                });
            }
            principals.push(principal);
        }

        let store = MemoryStore::new();
        for p in privileges { store.put_privilege(p); }
        for r in roles { store.put_role(r); }
        for u in principals { store.put_principal(u); }
        info!(
            target: "privguard::store",
            "store loaded: principals={} roles={} privileges={}",
            store.principal_count(),
            store.role_count(),
            store.privilege_count()
        );
        Ok(store)
    }
}

pub fn load_from_str(json: &str) -> Result<MemoryStore, LoadError> {
    let model: StoreModel = serde_json::from_str(json)?;
    model.build()
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<MemoryStore, LoadError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    load_from_str(&raw)
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod loader_tests;
