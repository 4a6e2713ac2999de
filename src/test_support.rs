//! Fixtures shared by unit tests: a cheap Argon2 hasher, a seeded store and
//! gated wrappers that park a thread mid-operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use crate::config::{HashingConfig, SessionConfig};
use crate::error::PrivilegeResult;
use crate::hashing::{Argon2Provider, HashingProvider};
use crate::model::{Principal, PrincipalRep, PrivilegeDef, Role, UserState};
use crate::policy::{PolicyRegistry, DEFAULT_POLICY, GLOB_POLICY};
use crate::session::SessionManager;
use crate::store::{CredentialStore, MemoryStore, MutableCredentialStore};

pub(crate) fn fast_hasher() -> Arc<Argon2Provider> {
    let mut cfg = HashingConfig::new(b"unit-test-salt-16".to_vec());
    cfg.m_cost = 256;
    cfg.t_cost = 1;
    Arc::new(Argon2Provider::new(&cfg).unwrap())
}

pub(crate) fn privilege(name: &str, policy: &str, all_allowed: bool, deny: &[&str], allow: &[&str]) -> PrivilegeDef {
    PrivilegeDef::new(
        name,
        policy,
        all_allowed,
        deny.iter().map(|s| s.to_string()).collect(),
        allow.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
}

pub(crate) fn add_principal(store: &MemoryStore, hasher: &dyn HashingProvider, name: &str, password: Option<&str>, state: UserState, roles: &[&str]) {
    let mut rep = PrincipalRep::new(name).with_state(state);
    for r in roles {
        rep = rep.with_role(*r);
    }
    let digest = password.map(|p| hasher.hash(p).unwrap());
    store.put_principal(Principal::new(rep, digest).unwrap());
}

/// admin/admin holds PrivilegeAdmin and reader; bob/bobpass holds nothing;
/// nina, dora and lou are NEW, DISABLED and LOCKED; nopw has no digest.
pub(crate) fn seeded_store(hasher: &dyn HashingProvider) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put_privilege(privilege("manage-users", DEFAULT_POLICY, true, &[], &[]));
    store.put_privilege(privilege("export", DEFAULT_POLICY, false, &["reports-confidential"], &["reports"]));
    store.put_privilege(privilege("files", GLOB_POLICY, false, &[], &["public/**"]));
    store.put_role(Role::new("PrivilegeAdmin", ["manage-users"]).unwrap());
    store.put_role(Role::new("reader", ["export", "files"]).unwrap());

    add_principal(&store, hasher, "admin", Some("admin"), UserState::Enabled, &["PrivilegeAdmin", "reader"]);
    add_principal(&store, hasher, "bob", Some("bobpass"), UserState::Enabled, &[]);
    add_principal(&store, hasher, "nina", Some("ninapass"), UserState::New, &[]);
    add_principal(&store, hasher, "dora", Some("dorapass"), UserState::Disabled, &[]);
    add_principal(&store, hasher, "lou", Some("loupass"), UserState::Locked, &[]);
    add_principal(&store, hasher, "nopw", None, UserState::Enabled, &[]);
    store
}

pub(crate) fn manager_with(config: SessionConfig) -> (Arc<MemoryStore>, SessionManager) {
    let hasher = fast_hasher();
    let store = seeded_store(&*hasher);
    let manager = SessionManager::new(config, store.clone(), hasher, Arc::new(PolicyRegistry::with_defaults()));
    (store, manager)
}

pub(crate) fn manager() -> (Arc<MemoryStore>, SessionManager) {
    manager_with(SessionConfig::default())
}

/// One-shot rendezvous: the first `pass` after `arm` blocks until the test has
/// seen it arrive and released it.
pub(crate) struct Gate {
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self { armed: AtomicBool::new(false), entered: Barrier::new(2), release: Barrier::new(2) }
    }

    pub(crate) fn arm(&self) { self.armed.store(true, Ordering::SeqCst); }

    pub(crate) fn wait_entered(&self) { self.entered.wait(); }

    pub(crate) fn release(&self) { self.release.wait(); }

    fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
    }
}

/// Parks in `next_token`, i.e. after the secret was checked and before the session is stored.
pub(crate) struct GatedHasher {
    pub(crate) inner: Arc<Argon2Provider>,
    pub(crate) gate: Gate,
}

impl HashingProvider for GatedHasher {
    fn hash(&self, secret: &str) -> PrivilegeResult<String> { self.inner.hash(secret) }

    fn next_token(&self) -> PrivilegeResult<String> {
        self.gate.pass();
        self.inner.next_token()
    }
}

/// Parks in `get_principal`.
pub(crate) struct GatedStore {
    pub(crate) inner: Arc<MemoryStore>,
    pub(crate) gate: Gate,
}

impl CredentialStore for GatedStore {
    fn get_principal(&self, name: &str) -> Option<Arc<Principal>> {
        self.gate.pass();
        self.inner.get_principal(name)
    }

    fn get_role(&self, name: &str) -> Option<Arc<Role>> { self.inner.get_role(name) }

    fn get_privilege(&self, name: &str) -> Option<Arc<PrivilegeDef>> { self.inner.get_privilege(name) }
}
