use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{CredentialStore, MutableCredentialStore};
use crate::error::PrivilegeResult;
use crate::model::{Principal, PrivilegeDef, Role};

/// Thread-safe in-memory store, one lock per table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    principals: RwLock<HashMap<String, Arc<Principal>>>,
    roles: RwLock<HashMap<String, Arc<Role>>>,
    privileges: RwLock<HashMap<String, Arc<PrivilegeDef>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn principal_count(&self) -> usize { self.principals.read().len() }
    pub fn role_count(&self) -> usize { self.roles.read().len() }
    pub fn privilege_count(&self) -> usize { self.privileges.read().len() }

    pub fn principal_names(&self) -> Vec<String> {
        let mut v: Vec<String> = self.principals.read().keys().cloned().collect();
        v.sort();
        v
    }
}

impl CredentialStore for MemoryStore {
    fn get_principal(&self, name: &str) -> Option<Arc<Principal>> {
        self.principals.read().get(name).cloned()
    }

    fn get_role(&self, name: &str) -> Option<Arc<Role>> {
        self.roles.read().get(name).cloned()
    }

    fn get_privilege(&self, name: &str) -> Option<Arc<PrivilegeDef>> {
        self.privileges.read().get(name).cloned()
    }
}

impl MutableCredentialStore for MemoryStore {
    fn put_principal(&self, principal: Principal) -> Option<Arc<Principal>> {
        self.principals.write().insert(principal.name().to_string(), Arc::new(principal))
    }

    fn update_principal(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut Principal) -> PrivilegeResult<()>,
    ) -> PrivilegeResult<bool> {
        let mut map = self.principals.write();
        let Some(current) = map.get(name) else { return Ok(false) };
        let mut next = Principal::clone(current);
        f(&mut next)?;
        map.insert(name.to_string(), Arc::new(next));
        Ok(true)
    }

    fn remove_principal(&self, name: &str) -> Option<Arc<Principal>> {
        self.principals.write().remove(name)
    }

    fn put_role(&self, role: Role) -> Option<Arc<Role>> {
        self.roles.write().insert(role.name().to_string(), Arc::new(role))
    }

    fn put_privilege(&self, privilege: PrivilegeDef) -> Option<Arc<PrivilegeDef>> {
        self.privileges.write().insert(privilege.name().to_string(), Arc::new(privilege))
    }
}
