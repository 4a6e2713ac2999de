//! Administrative mutations of the credential store.
//!
//! Every call presents the caller's [`Credential`]; it must validate and the
//! principal must hold [`ADMIN_ROLE`]. Writes go straight to the store, so open
//! sessions see them on their next decision.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{PrivilegeError, PrivilegeResult};
use crate::model::{Credential, Principal, PrincipalRep, PrivilegeDef, Role, UserState};
use crate::session::SessionManager;
use crate::store::MutableCredentialStore;

/// Role a principal must hold to use [`PrivilegeAdmin`].
pub const ADMIN_ROLE: &str = "PrivilegeAdmin";

pub struct PrivilegeAdmin {
    sessions: Arc<SessionManager>,
    store: Arc<dyn MutableCredentialStore>,
}

impl PrivilegeAdmin {
    /// `store` must be the same store the session manager reads from.
    pub fn new(sessions: Arc<SessionManager>, store: Arc<dyn MutableCredentialStore>) -> Self {
        Self { sessions, store }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> { &self.sessions }

    fn require_admin(&self, credential: &Credential, op: &str) -> PrivilegeResult<Arc<Principal>> {
        let caller = self.sessions.validate(credential)?;
        if !caller.has_role(ADMIN_ROLE) {
            debug!(target: "privguard::admin", "deny user={} op={} reason=not_admin", caller.name(), op);
            return Err(PrivilegeError::access_denied(
                "admin_role_required".to_string(),
                format!("{} may not perform {}: role {} required", caller.name(), op, ADMIN_ROLE),
            ));
        }
        Ok(caller)
    }

    fn digest(&self, password: Option<&str>) -> PrivilegeResult<Option<String>> {
        match password {
            Some(p) => {
                self.sessions.check_input("password", p)?;
                Ok(Some(self.sessions.hasher().hash(p)?))
            }
            None => Ok(None),
        }
    }

    fn require_role_defined(&self, role: &str) -> PrivilegeResult<()> {
        if self.store.get_role(role).is_none() {
            return Err(PrivilegeError::validation("unknown_role".to_string(), format!("role {} is not defined", role)));
        }
        Ok(())
    }

    fn update(&self, name: &str, f: &mut dyn FnMut(&mut Principal) -> PrivilegeResult<()>) -> PrivilegeResult<()> {
        if self.store.update_principal(name, f)? {
            Ok(())
        } else {
            Err(unknown_principal(name))
        }
    }

    /// Insert or fully replace a principal. `password: None` leaves it without a
    /// digest, so it cannot authenticate until one is set.
    pub fn add_or_replace_principal(
        &self,
        credential: &Credential,
        rep: PrincipalRep,
        password: Option<&str>,
    ) -> PrivilegeResult<()> {
        let caller = self.require_admin(credential, "add_or_replace_principal")?;
        for role in rep.roles.iter() {
            self.require_role_defined(role)?;
        }
        let principal = Principal::new(rep, self.digest(password)?)?;
        let name = principal.name().to_string();
        let replaced = self.store.put_principal(principal).is_some();
        info!(target: "privguard::admin", "principal.put by={} name={} replaced={}", caller.name(), name, replaced);
        Ok(())
    }

    /// `None` clears the digest.
    pub fn set_principal_password(&self, credential: &Credential, name: &str, password: Option<&str>) -> PrivilegeResult<()> {
        let caller = self.require_admin(credential, "set_principal_password")?;
        let digest = self.digest(password)?;
        self.update(name, &mut |p: &mut Principal| {
            p.set_password_hash(digest.clone());
            Ok(())
        })?;
        info!(target: "privguard::admin", "principal.password by={} name={} cleared={}", caller.name(), name, password.is_none());
        Ok(())
    }

    pub fn set_principal_state(&self, credential: &Credential, name: &str, state: UserState) -> PrivilegeResult<()> {
        let caller = self.require_admin(credential, "set_principal_state")?;
        self.update(name, &mut |p: &mut Principal| {
            p.set_state(state);
            Ok(())
        })?;
        info!(target: "privguard::admin", "principal.state by={} name={} state={}", caller.name(), name, state);
        Ok(())
    }

    /// Returns `false` when the principal already held the role.
    pub fn add_role_to_principal(&self, credential: &Credential, name: &str, role: &str) -> PrivilegeResult<bool> {
        let caller = self.require_admin(credential, "add_role_to_principal")?;
        self.require_role_defined(role)?;
        let mut added = false;
        self.update(name, &mut |p: &mut Principal| {
            added = p.add_role(role)?;
            Ok(())
        })?;
        info!(target: "privguard::admin", "principal.add_role by={} name={} role={} added={}", caller.name(), name, role, added);
        Ok(added)
    }

    /// Returns `false` when the principal did not hold the role.
    pub fn remove_role_from_principal(&self, credential: &Credential, name: &str, role: &str) -> PrivilegeResult<bool> {
        let caller = self.require_admin(credential, "remove_role_from_principal")?;
        let mut removed = false;
        self.update(name, &mut |p: &mut Principal| {
            removed = p.remove_role(role);
            Ok(())
        })?;
        info!(target: "privguard::admin", "principal.remove_role by={} name={} role={} removed={}", caller.name(), name, role, removed);
        Ok(removed)
    }

    /// Remove a principal and end all of its sessions.
    pub fn remove_principal(&self, credential: &Credential, name: &str) -> PrivilegeResult<PrincipalRep> {
        let caller = self.require_admin(credential, "remove_principal")?;
        let store = &self.store;
        let Some((removed, revoked)) = self.sessions.retire_principal(name, |n| store.remove_principal(n)) else {
            return Err(unknown_principal(name));
        };
        info!(target: "privguard::admin", "principal.remove by={} name={} sessions={}", caller.name(), name, revoked);
        Ok(removed.as_rep())
    }

    /// Every privilege the role lists must already be defined.
    pub fn add_or_replace_role(&self, credential: &Credential, role: Role) -> PrivilegeResult<()> {
        let caller = self.require_admin(credential, "add_or_replace_role")?;
        if let Some(missing) = role.privilege_names().find(|p| self.store.get_privilege(p).is_none()) {
            return Err(PrivilegeError::validation(
                "unknown_privilege".to_string(),
                format!("role {} references undefined privilege {}", role.name(), missing),
            ));
        }
        let name = role.name().to_string();
        let replaced = self.store.put_role(role).is_some();
        info!(target: "privguard::admin", "role.put by={} name={} replaced={}", caller.name(), name, replaced);
        Ok(())
    }

    /// The privilege's policy id must be registered with the engine.
    pub fn add_or_replace_privilege(&self, credential: &Credential, privilege: PrivilegeDef) -> PrivilegeResult<()> {
        let caller = self.require_admin(credential, "add_or_replace_privilege")?;
        if !self.sessions.engine().policies().contains(privilege.policy()) {
            return Err(PrivilegeError::validation(
                "unknown_policy".to_string(),
                format!("privilege {} names unregistered policy {}", privilege.name(), privilege.policy()),
            ));
        }
        let name = privilege.name().to_string();
        let replaced = self.store.put_privilege(privilege).is_some();
        info!(target: "privguard::admin", "privilege.put by={} name={} replaced={}", caller.name(), name, replaced);
        Ok(())
    }
}

fn unknown_principal(name: &str) -> PrivilegeError {
    PrivilegeError::validation("unknown_principal".to_string(), format!("principal {} does not exist", name))
}

impl std::fmt::Debug for PrivilegeAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegeAdmin").field("sessions", &self.sessions).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::model::ProtectedAction;
    use crate::policy::{PolicyRegistry, DEFAULT_POLICY};
    use crate::test_support::{fast_hasher, manager, privilege, seeded_store, Gate, GatedHasher, GatedStore};

    fn setup() -> (PrivilegeAdmin, Credential) {
        let (store, sm) = manager();
        let admin = PrivilegeAdmin::new(Arc::new(sm), store);
        let cred = admin.sessions().authenticate("admin", "admin").unwrap();
        (admin, cred)
    }

    #[test]
    fn new_principal_lifecycle() {
        let (admin, cred) = setup();
        let sm = admin.sessions().clone();
        admin.add_or_replace_principal(&cred, PrincipalRep::new("ted"), None).unwrap();
        // NEW and without a password
        assert!(sm.authenticate("ted", "tedpass").is_err());
        admin.set_principal_password(&cred, "ted", Some("tedpass")).unwrap();
        assert!(sm.authenticate("ted", "tedpass").is_err());
        admin.set_principal_state(&cred, "ted", UserState::Enabled).unwrap();
        let ted = sm.authenticate("ted", "tedpass").unwrap();
        assert!(sm.is_action_allowed(&ted, &ProtectedAction::new("manage-users", "x")).is_err());

        assert!(admin.add_role_to_principal(&cred, "ted", ADMIN_ROLE).unwrap());
        assert!(!admin.add_role_to_principal(&cred, "ted", ADMIN_ROLE).unwrap());
        assert!(sm.is_action_allowed(&ted, &ProtectedAction::new("manage-users", "x")).unwrap());
        assert!(admin.remove_role_from_principal(&cred, "ted", ADMIN_ROLE).unwrap());
        assert!(!admin.remove_role_from_principal(&cred, "ted", ADMIN_ROLE).unwrap());
    }

    #[test]
    fn non_admin_is_refused() {
        let (admin, _) = setup();
        let bob = admin.sessions().authenticate("bob", "bobpass").unwrap();
        let err = admin.add_or_replace_principal(&bob, PrincipalRep::new("ted"), None).unwrap_err();
        assert!(err.is_access_denied());
        assert_eq!(err.code_str(), "admin_role_required");
        assert!(admin.set_principal_state(&bob, "bob", UserState::Locked).unwrap_err().is_access_denied());
    }

    #[test]
    fn tampered_admin_credential_is_integrity_fault() {
        let (admin, mut cred) = setup();
        cred.auth_token.push('x');
        assert!(admin.set_principal_state(&cred, "bob", UserState::Locked).unwrap_err().is_integrity());
    }

    #[test]
    fn passwords_obey_minimum_length() {
        let (admin, cred) = setup();
        let err = admin.set_principal_password(&cred, "bob", Some("ab")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.code_str(), "password_too_short");
        // the old password still works
        assert!(admin.sessions().authenticate("bob", "bobpass").is_ok());
    }

    #[test]
    fn clearing_password_blocks_authentication() {
        let (admin, cred) = setup();
        admin.set_principal_password(&cred, "bob", None).unwrap();
        assert!(admin.sessions().authenticate("bob", "bobpass").is_err());
    }

    #[test]
    fn unknown_targets_are_validation_faults() {
        let (admin, cred) = setup();
        assert_eq!(admin.set_principal_state(&cred, "ghost", UserState::Enabled).unwrap_err().code_str(), "unknown_principal");
        assert_eq!(admin.add_role_to_principal(&cred, "bob", "ghost-role").unwrap_err().code_str(), "unknown_role");
        let rep = PrincipalRep::new("ted").with_role("ghost-role");
        assert_eq!(admin.add_or_replace_principal(&cred, rep, None).unwrap_err().code_str(), "unknown_role");
        let role = Role::new("r", ["ghost"]).unwrap();
        assert_eq!(admin.add_or_replace_role(&cred, role).unwrap_err().code_str(), "unknown_privilege");
        let p = privilege("p", "NoSuchPolicy", true, &[], &[]);
        assert_eq!(admin.add_or_replace_privilege(&cred, p).unwrap_err().code_str(), "unknown_policy");
    }

    #[test]
    fn remove_principal_ends_its_sessions() {
        let (admin, cred) = setup();
        let bob = admin.sessions().authenticate("bob", "bobpass").unwrap();
        let rep = admin.remove_principal(&cred, "bob").unwrap();
        assert_eq!(rep.name, "bob");
        assert!(admin.sessions().validate(&bob).unwrap_err().is_access_denied());
        assert_eq!(admin.remove_principal(&cred, "bob").unwrap_err().code_str(), "unknown_principal");
    }

    #[test]
    fn role_and_privilege_replacement_is_visible_immediately() {
        let (admin, cred) = setup();
        let sm = admin.sessions().clone();
        let bob = sm.authenticate("bob", "bobpass").unwrap();
        admin.add_or_replace_privilege(&cred, privilege("audit", DEFAULT_POLICY, false, &[], &["ledger"])).unwrap();
        admin.add_or_replace_role(&cred, Role::new("auditor", ["audit"]).unwrap()).unwrap();
        admin.add_role_to_principal(&cred, "bob", "auditor").unwrap();
        assert!(sm.is_action_allowed(&bob, &ProtectedAction::new("audit", "ledger")).unwrap());

        admin.add_or_replace_privilege(&cred, privilege("audit", DEFAULT_POLICY, false, &["ledger"], &["ledger"])).unwrap();
        assert!(!sm.is_action_allowed(&bob, &ProtectedAction::new("audit", "ledger")).unwrap());
    }

    #[test]
    fn removal_during_authentication_issues_no_session() {
        let hasher = Arc::new(GatedHasher { inner: fast_hasher(), gate: Gate::new() });
        let store = seeded_store(&*hasher);
        let sm = SessionManager::new(SessionConfig::default(), store.clone(), hasher.clone(), Arc::new(PolicyRegistry::with_defaults()));
        let admin = PrivilegeAdmin::new(Arc::new(sm), store);
        let cred = admin.sessions().authenticate("admin", "admin").unwrap();

        hasher.gate.arm();
        std::thread::scope(|s| {
            let bob = s.spawn(|| admin.sessions().authenticate("bob", "bobpass"));
            // bob's secret is verified; his session is not stored yet
            hasher.gate.wait_entered();
            admin.remove_principal(&cred, "bob").unwrap();
            hasher.gate.release();

            let err = bob.join().unwrap().unwrap_err();
            assert!(err.is_access_denied());
            assert_eq!(err.code_str(), crate::error::INVALID_CREDENTIALS);
        });
        assert!(admin.sessions().sessions_for("bob").is_empty());
    }

    #[test]
    fn removal_during_validation_is_a_plain_denial() {
        let hasher = fast_hasher();
        let inner = seeded_store(&*hasher);
        let gated = Arc::new(GatedStore { inner: inner.clone(), gate: Gate::new() });
        let sm = SessionManager::new(SessionConfig::default(), gated.clone(), hasher, Arc::new(PolicyRegistry::with_defaults()));
        let admin = PrivilegeAdmin::new(Arc::new(sm), inner);
        let cred = admin.sessions().authenticate("admin", "admin").unwrap();
        let bob = admin.sessions().authenticate("bob", "bobpass").unwrap();

        gated.gate.arm();
        std::thread::scope(|s| {
            let check = s.spawn(|| admin.sessions().validate(&bob));
            // the session passed its checks; the principal lookup is pending
            gated.gate.wait_entered();
            admin.remove_principal(&cred, "bob").unwrap();
            gated.gate.release();

            let err = check.join().unwrap().unwrap_err();
            assert!(err.is_access_denied(), "{err}");
            assert_eq!(err.code_str(), "no_session");
        });
    }
}
