//! privguard: session-based authentication and role/privilege authorization.
//!
//! A [`SessionManager`] authenticates principals against a [`CredentialStore`]
//! and hands out [`Credential`]s; privileged calls present the credential and
//! are decided by the [`AuthorizationEngine`] using the privilege's policy.
//! [`PrivilegeAdmin`] mutates the store on behalf of holders of the admin role.
//!
//! Diagnostics are emitted through `tracing` under the `privguard::*` targets;
//! install a subscriber to see them.

pub mod admin;
pub mod authz;
pub mod config;
pub mod error;
pub mod hashing;
pub mod model;
pub mod policy;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_support;

pub use admin::{PrivilegeAdmin, ADMIN_ROLE};
pub use authz::AuthorizationEngine;
pub use config::{HashingConfig, SessionConfig};
pub use error::{PrivilegeError, PrivilegeResult};
pub use hashing::{Argon2Provider, HashingProvider};
pub use model::{Credential, Principal, PrincipalRep, PrivilegeDef, ProtectedAction, Restrictable, Role, Session, UserState};
pub use policy::{PolicyEvaluator, PolicyRegistry, DEFAULT_POLICY, GLOB_POLICY};
pub use session::SessionManager;
pub use store::{CredentialStore, MemoryStore, MutableCredentialStore};
