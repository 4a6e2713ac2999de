use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::require_name;
use crate::error::{PrivilegeError, PrivilegeResult};

/// Lifecycle state of a principal. Only `Enabled` principals may authenticate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserState {
    #[default]
    New,
    Enabled,
    Disabled,
    Locked,
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserState::New => "NEW",
            UserState::Enabled => "ENABLED",
            UserState::Disabled => "DISABLED",
            UserState::Locked => "LOCKED",
        };
        f.write_str(s)
    }
}

fn default_locale() -> String { "en".to_string() }

/// Plain, password-free view of a principal used by administrative calls and store files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrincipalRep {
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub state: UserState,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for PrincipalRep {
    fn default() -> Self {
        Self {
            name: String::new(),
            first_name: String::new(),
            surname: String::new(),
            state: UserState::New,
            roles: BTreeSet::new(),
            locale: default_locale(),
        }
    }
}

impl PrincipalRep {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_state(mut self, state: UserState) -> Self {
        self.state = state;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}

/// A registered identity. Roles are referenced by name and resolved lazily.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    password_hash: Option<String>,
    first_name: String,
    surname: String,
    state: UserState,
    roles: BTreeSet<String>,
    locale: String,
}

impl Principal {
    /// Build a principal from its representation and an optional password digest.
    /// A principal without a digest can never authenticate.
    pub fn new(rep: PrincipalRep, password_hash: Option<String>) -> PrivilegeResult<Self> {
        require_name("principal", &rep.name)?;
        for role in rep.roles.iter() {
            require_role_entry(&rep.name, role)?;
        }
        Ok(Self {
            name: rep.name,
            password_hash,
            first_name: rep.first_name,
            surname: rep.surname,
            state: rep.state,
            roles: rep.roles,
            locale: rep.locale,
        })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn password_hash(&self) -> Option<&str> { self.password_hash.as_deref() }
    pub fn first_name(&self) -> &str { &self.first_name }
    pub fn surname(&self) -> &str { &self.surname }
    pub fn state(&self) -> UserState { self.state }
    pub fn roles(&self) -> &BTreeSet<String> { &self.roles }
    pub fn locale(&self) -> &str { &self.locale }

    pub fn is_enabled(&self) -> bool { self.state == UserState::Enabled }

    pub fn has_role(&self, role: &str) -> bool { self.roles.contains(role) }

    pub fn set_state(&mut self, state: UserState) { self.state = state; }

    pub fn set_password_hash(&mut self, hash: Option<String>) { self.password_hash = hash; }

    pub fn add_role(&mut self, role: &str) -> PrivilegeResult<bool> {
        require_role_entry(&self.name, role)?;
        Ok(self.roles.insert(role.to_string()))
    }

    pub fn remove_role(&mut self, role: &str) -> bool { self.roles.remove(role) }

    pub fn as_rep(&self) -> PrincipalRep {
        PrincipalRep {
            name: self.name.clone(),
            first_name: self.first_name.clone(),
            surname: self.surname.clone(),
            state: self.state,
            roles: self.roles.clone(),
            locale: self.locale.clone(),
        }
    }
}

fn require_role_entry(principal: &str, role: &str) -> PrivilegeResult<()> {
    if role.trim().is_empty() {
        return Err(PrivilegeError::validation(
            "empty_role_reference".to_string(),
            format!("principal {} references a role with no name", principal),
        ));
    }
    Ok(())
}

// Keep the digest out of logs.
impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("roles", &self.roles)
            .field("locale", &self.locale)
            .field("has_password", &self.password_hash.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        let err = Principal::new(PrincipalRep::new(""), None).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.code_str(), "empty_principal_name");
    }

    #[test]
    fn rejects_empty_role_entry() {
        let rep = PrincipalRep::new("admin").with_role(" ");
        assert!(Principal::new(rep, None).unwrap_err().is_validation());
    }

    #[test]
    fn mutators_keep_invariants() {
        let mut p = Principal::new(PrincipalRep::new("bob"), None).unwrap();
        assert_eq!(p.state(), UserState::New);
        assert!(!p.is_enabled());
        p.set_state(UserState::Enabled);
        assert!(p.is_enabled());
        assert!(p.add_role("user").unwrap());
        assert!(!p.add_role("user").unwrap());
        assert!(p.add_role("").is_err());
        assert!(p.has_role("user"));
        assert!(p.remove_role("user"));
        assert!(p.roles().is_empty());
    }

    #[test]
    fn debug_hides_digest() {
        let p = Principal::new(PrincipalRep::new("admin"), Some("$argon2id$secret".into())).unwrap();
        let dbg = format!("{:?}", p);
        assert!(!dbg.contains("argon2id"), "got: {dbg}");
        assert!(dbg.contains("has_password: true"));
    }

    #[test]
    fn state_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&UserState::Enabled).unwrap(), "\"ENABLED\"");
        let s: UserState = serde_json::from_str("\"LOCKED\"").unwrap();
        assert_eq!(s, UserState::Locked);
        assert_eq!(s.to_string(), "LOCKED");
    }
}
