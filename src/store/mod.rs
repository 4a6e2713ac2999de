//! Credential store contracts and the in-memory implementation.
//! Lookups return `None` for "not found"; that is a normal outcome, not an error.

mod memory;
pub mod loader;

pub use memory::MemoryStore;
pub use loader::{load_from_path, load_from_str, LoadError, StoreModel};

use std::sync::Arc;

use crate::error::PrivilegeResult;
use crate::model::{Principal, PrivilegeDef, Role};

/// Read side consumed by the session manager and the authorization engine.
/// Implementations must tolerate concurrent readers while writers are active,
/// and must not cache records: a write is visible to the next read.
pub trait CredentialStore: Send + Sync {
    fn get_principal(&self, name: &str) -> Option<Arc<Principal>>;
    fn get_role(&self, name: &str) -> Option<Arc<Role>>;
    fn get_privilege(&self, name: &str) -> Option<Arc<PrivilegeDef>>;
}

/// Administrative write side. Every write replaces the stored `Arc`, so
/// readers holding the previous snapshot keep a consistent value.
pub trait MutableCredentialStore: CredentialStore {
    /// Insert or replace; returns the previous record.
    fn put_principal(&self, principal: Principal) -> Option<Arc<Principal>>;
    /// Read-modify-write under the store's lock. `Ok(false)` when the principal does not exist.
    fn update_principal(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut Principal) -> PrivilegeResult<()>,
    ) -> PrivilegeResult<bool>;
    fn remove_principal(&self, name: &str) -> Option<Arc<Principal>>;
    fn put_role(&self, role: Role) -> Option<Arc<Role>>;
    fn put_privilege(&self, privilege: PrivilegeDef) -> Option<Arc<PrivilegeDef>>;
}
