use std::collections::BTreeSet;

use serde::Serialize;

use super::require_name;
use crate::error::{PrivilegeError, PrivilegeResult};

/// A named gate: holders of the role may consult the listed privileges.
/// Immutable after construction; replacing a role builds a new value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Role {
    name: String,
    privileges: BTreeSet<String>,
}

impl Role {
    pub fn new<I, S>(name: impl Into<String>, privileges: I) -> PrivilegeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        require_name("role", &name)?;
        let mut set = BTreeSet::new();
        for p in privileges.into_iter() {
            let p: String = p.into();
            if p.trim().is_empty() {
                return Err(PrivilegeError::validation(
                    "empty_privilege_reference".to_string(),
                    format!("role {} references a privilege with no name", name),
                ));
            }
            if !set.insert(p.clone()) {
                return Err(PrivilegeError::validation(
                    "duplicate_privilege_reference".to_string(),
                    format!("role {} lists privilege {} more than once", name, p),
                ));
            }
        }
        Ok(Self { name, privileges: set })
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn has_privilege(&self, privilege: &str) -> bool { self.privileges.contains(privilege) }

    pub fn privilege_names(&self) -> impl Iterator<Item = &str> {
        self.privileges.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_case_sensitive() {
        let role = Role::new("admin-role", ["manage-users"]).unwrap();
        assert!(role.has_privilege("manage-users"));
        assert!(!role.has_privilege("Manage-Users"));
        assert_eq!(role.privilege_names().collect::<Vec<_>>(), vec!["manage-users"]);
    }

    #[test]
    fn rejects_bad_entries() {
        assert!(Role::new("", Vec::<String>::new()).unwrap_err().is_validation());
        assert_eq!(
            Role::new("r", ["a", ""]).unwrap_err().code_str(),
            "empty_privilege_reference"
        );
        assert_eq!(
            Role::new("r", ["a", "a"]).unwrap_err().code_str(),
            "duplicate_privilege_reference"
        );
    }

    #[test]
    fn empty_role_is_allowed() {
        let role = Role::new("user", Vec::<String>::new()).unwrap();
        assert_eq!(role.privilege_names().count(), 0);
    }
}
