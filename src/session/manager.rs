use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::authz::AuthorizationEngine;
use crate::config::SessionConfig;
use crate::error::{PrivilegeError, PrivilegeResult};
use crate::hashing::{random_token, secure_eq, HashingProvider};
use crate::model::{Credential, Principal, Restrictable, Session};
use crate::policy::PolicyRegistry;
use crate::store::CredentialStore;

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    credential: Credential,
}

/// Sessions by id plus a principal -> session ids index, guarded together.
#[derive(Debug, Default)]
struct SessionTable {
    sessions: HashMap<String, SessionEntry>,
    by_principal: HashMap<String, HashSet<String>>,
}

impl SessionTable {
    fn insert(&mut self, entry: SessionEntry) {
        self.by_principal
            .entry(entry.session.username.clone())
            .or_default()
            .insert(entry.session.session_id.clone());
        self.sessions.insert(entry.session.session_id.clone(), entry);
    }

    fn remove(&mut self, session_id: &str) -> Option<SessionEntry> {
        let entry = self.sessions.remove(session_id)?;
        if let Some(ids) = self.by_principal.get_mut(&entry.session.username) {
            ids.remove(session_id);
            if ids.is_empty() {
                self.by_principal.remove(&entry.session.username);
            }
        }
        Some(entry)
    }

    fn remove_principal(&mut self, username: &str) -> usize {
        let Some(ids) = self.by_principal.remove(username) else { return 0 };
        ids.iter().filter(|id| self.sessions.remove(id.as_str()).is_some()).count()
    }

    fn oldest_for(&self, username: &str) -> Option<String> {
        self.by_principal
            .get(username)?
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .min_by_key(|e| e.session.created_at)
            .map(|e| e.session.session_id.clone())
    }

    fn count_for(&self, username: &str) -> usize {
        self.by_principal.get(username).map(|s| s.len()).unwrap_or(0)
    }
}

/// Owns the table of active sessions and fronts every privileged call.
///
/// `authenticate` issues a [`Credential`]; every later call presents it and is
/// validated (existence, field equality, keyed token check) before the
/// [`AuthorizationEngine`] is consulted. Sessions live until `invalidate`
/// unless [`SessionConfig::session_ttl`] is set.
pub struct SessionManager {
    config: SessionConfig,
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn HashingProvider>,
    engine: AuthorizationEngine,
    table: RwLock<SessionTable>,
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn HashingProvider>,
        policies: Arc<PolicyRegistry>,
    ) -> Self {
        let engine = AuthorizationEngine::new(store.clone(), policies);
        Self { config, store, hasher, engine, table: RwLock::new(SessionTable::default()) }
    }

    pub fn config(&self) -> &SessionConfig { &self.config }

    pub fn engine(&self) -> &AuthorizationEngine { &self.engine }

    pub(crate) fn hasher(&self) -> &Arc<dyn HashingProvider> { &self.hasher }

    /// Reject inputs shorter than the configured minimum before touching the store.
    pub(crate) fn check_input(&self, what: &str, value: &str) -> PrivilegeResult<()> {
        if value.chars().count() < self.config.min_credential_len {
            return Err(PrivilegeError::validation(
                format!("{}_too_short", what),
                format!("the given {} is shorter than {} characters", what, self.config.min_credential_len),
            ));
        }
        Ok(())
    }

    /// Authenticate `name` with `secret` and open a new session.
    ///
    /// Unknown principal, wrong secret and a non-`ENABLED` state all return the
    /// same `invalid_credentials` error.
    pub fn authenticate(&self, name: &str, secret: &str) -> PrivilegeResult<Credential> {
        self.check_input("username", name)?;
        self.check_input("password", secret)?;

        let digest = self.hasher.hash(secret)?;
        let Some(principal) = self.store.get_principal(name) else {
            return Err(self.auth_failure(name, "unknown_principal"));
        };
        let digest_ok = principal.password_hash().map(|h| secure_eq(h, &digest)).unwrap_or(false);
        if !digest_ok {
            return Err(self.auth_failure(name, "bad_secret"));
        }
        if !principal.is_enabled() {
            return Err(self.auth_failure(name, "not_enabled"));
        }

        let auth_token = self.hasher.next_token()?;
        let auth_password = self.hasher.next_token()?;
        let now = Utc::now();
        let expires_at = self.expiry_from(now);

        let mut table = self.table.write();
        // Removal of the principal holds this lock; re-check so no session outlives it.
        if self.store.get_principal(principal.name()).is_none() {
            return Err(self.auth_failure(name, "removed_during_authentication"));
        }
        let mut session_id = random_token()?;
        while table.sessions.contains_key(&session_id) {
            session_id = random_token()?;
        }
        if self.config.revoke_on_reauthenticate {
            let revoked = table.remove_principal(principal.name());
            if revoked > 0 {
                debug!(target: "privguard::session", "session.revoke_on_reauth user={} count={}", principal.name(), revoked);
            }
        }
        if let Some(max) = self.config.max_sessions_per_principal {
            while table.count_for(principal.name()) >= max {
                let Some(oldest) = table.oldest_for(principal.name()) else { break };
                table.remove(&oldest);
                debug!(target: "privguard::session", "session.evict user={} sid={}", principal.name(), oldest);
            }
        }

        let credential = Credential {
            session_id: session_id.clone(),
            username: principal.name().to_string(),
            auth_token: auth_token.clone(),
            auth_password: auth_password.clone(),
            locale: principal.locale().to_string(),
        };
        let session = Session {
            session_id: session_id.clone(),
            auth_token,
            auth_password,
            username: principal.name().to_string(),
            created_at: now,
            expires_at,
        };
        table.insert(SessionEntry { session, credential: credential.clone() });
        drop(table);

        info!(target: "privguard::session", "session.issue user={} sid={} expires_at={:?}", principal.name(), session_id, expires_at);
        Ok(credential)
    }

    fn auth_failure(&self, name: &str, reason: &str) -> PrivilegeError {
        debug!(target: "privguard::session", "auth.denied user={} reason={}", name, reason);
        PrivilegeError::invalid_credentials()
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.config.session_ttl?).ok()?;
        now.checked_add_signed(ttl)
    }

    /// Check a presented credential against the session table and resolve its principal.
    pub fn validate(&self, credential: &Credential) -> PrivilegeResult<Arc<Principal>> {
        let found = {
            let table = self.table.read();
            table
                .sessions
                .get(&credential.session_id)
                .map(|e| (e.session.clone(), e.credential.clone()))
        };
        let Some((session, stored)) = found else {
            debug!(target: "privguard::session", "validate.denied sid={} reason=no_session", credential.session_id);
            return Err(PrivilegeError::access_denied(
                "no_session".to_string(),
                format!("there is no session information for {}", credential),
            ));
        };

        if session.is_expired(Utc::now()) {
            self.table.write().remove(&session.session_id);
            debug!(target: "privguard::session", "validate.denied sid={} reason=expired", session.session_id);
            return Err(PrivilegeError::access_denied(
                "session_expired".to_string(),
                format!("the session for {} has expired", credential),
            ));
        }

        if stored != *credential {
            warn!(target: "privguard::session", "integrity.violation sid={} check=equality", credential.session_id);
            return Err(PrivilegeError::integrity(
                "credential_mismatch".to_string(),
                format!("received illegal credential for session id {}", credential.session_id),
            ));
        }

        let token_ok = credential
            .auth_token(&session.auth_password)
            .map(|t| secure_eq(t, &session.auth_token))
            .unwrap_or(false);
        if !token_ok {
            warn!(target: "privguard::session", "integrity.violation sid={} check=auth_token", credential.session_id);
            return Err(PrivilegeError::integrity(
                "credential_token_mismatch".to_string(),
                format!("received illegal credential data for session id {}", credential.session_id),
            ));
        }

        match self.store.get_principal(&session.username) {
            Some(principal) => Ok(principal),
            // Principal and sessions were retired together after the table was read.
            None if !self.table.read().sessions.contains_key(&session.session_id) => {
                debug!(target: "privguard::session", "validate.denied sid={} reason=principal_removed", session.session_id);
                Err(PrivilegeError::access_denied(
                    "no_session".to_string(),
                    format!("there is no session information for {}", credential),
                ))
            }
            None => {
                error!(target: "privguard::session", "session sid={} outlived principal {}", session.session_id, session.username);
                Err(PrivilegeError::internal(
                    "session_principal_missing".to_string(),
                    format!("session {} references principal {} which no longer exists", session.session_id, session.username),
                ))
            }
        }
    }

    /// Validate `credential`, then ask the authorization engine about `action`.
    pub fn is_action_allowed(&self, credential: &Credential, action: &dyn Restrictable) -> PrivilegeResult<bool> {
        let principal = self.validate(credential)?;
        self.engine.is_allowed(&principal, action)
    }

    /// Log out. `Ok(false)` when the session is already gone; a credential that
    /// does not match the stored one cannot end the session.
    pub fn invalidate(&self, credential: &Credential) -> PrivilegeResult<bool> {
        let mut table = self.table.write();
        let Some(entry) = table.sessions.get(&credential.session_id) else { return Ok(false) };
        if entry.credential != *credential {
            drop(table);
            warn!(target: "privguard::session", "integrity.violation sid={} check=logout", credential.session_id);
            return Err(PrivilegeError::integrity(
                "credential_mismatch".to_string(),
                format!("received illegal credential for session id {}", credential.session_id),
            ));
        }
        table.remove(&credential.session_id);
        drop(table);
        info!(target: "privguard::session", "session.logout user={} sid={}", credential.username, credential.session_id);
        Ok(true)
    }

    /// Drop every session of `username`; returns how many were removed.
    pub fn invalidate_principal(&self, username: &str) -> usize {
        let count = self.table.write().remove_principal(username);
        info!(target: "privguard::session", "session.revoke user={} count={}", username, count);
        count
    }

    /// Run `remove` against the store and drop the principal's sessions under one
    /// hold of the session table, so no authentication can interleave. Returns the
    /// removed record and the number of sessions ended.
    pub(crate) fn retire_principal(
        &self,
        username: &str,
        remove: impl FnOnce(&str) -> Option<Arc<Principal>>,
    ) -> Option<(Arc<Principal>, usize)> {
        let mut table = self.table.write();
        let removed = remove(username)?;
        let count = table.remove_principal(username);
        drop(table);
        info!(target: "privguard::session", "session.revoke user={} count={} reason=principal_removed", username, count);
        Some((removed, count))
    }

    /// Remove expired sessions; a no-op unless a TTL is configured.
    pub fn purge_expired(&self) -> usize {
        if self.config.session_ttl.is_none() {
            return 0;
        }
        let now = Utc::now();
        let mut table = self.table.write();
        let expired: Vec<String> = table
            .sessions
            .values()
            .filter(|e| e.session.is_expired(now))
            .map(|e| e.session.session_id.clone())
            .collect();
        for id in expired.iter() {
            table.remove(id);
        }
        expired.len()
    }

    pub fn session_count(&self) -> usize { self.table.read().sessions.len() }

    /// Active sessions of `username`, oldest first.
    pub fn sessions_for(&self, username: &str) -> Vec<Session> {
        let table = self.table.read();
        let mut out: Vec<Session> = table
            .by_principal
            .get(username)
            .map(|ids| ids.iter().filter_map(|id| table.sessions.get(id)).map(|e| e.session.clone()).collect())
            .unwrap_or_default();
        out.sort_by_key(|s| s.created_at);
        out
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;
