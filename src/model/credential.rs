use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Caller-held proof of a successful authentication.
///
/// A credential is only accepted when it equals, field for field, the copy
/// stored at issuance for its session id, and when [`Credential::auth_token`]
/// unlocks with the session's stored secondary token.
///
/// The secondary token travels with the credential, so its holder can always
/// satisfy the keyed check; the check catches corruption and naive edits of
/// the primary token, not a deliberate forger who already holds the pair.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub session_id: String,
    pub username: String,
    pub auth_token: String,
    pub auth_password: String,
    pub locale: String,
}

impl Credential {
    /// Returns the primary token when `key` matches this credential's secondary token.
    pub fn auth_token(&self, key: &str) -> Option<&str> {
        if bool::from(self.auth_password.as_bytes().ct_eq(key.as_bytes())) {
            Some(&self.auth_token)
        } else {
            None
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("session_id", &self.session_id)
            .field("username", &self.username)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.session_id)
    }
}

/// Server-side state backing a credential. Never handed to callers.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub auth_token: String,
    pub auth_password: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("username", &self.username)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
