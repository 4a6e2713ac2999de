use serde::Serialize;

use super::require_name;
use crate::error::{PrivilegeError, PrivilegeResult};

/// The global allow/deny rule set for one named capability.
/// `policy` selects the evaluator that interprets the lists.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PrivilegeDef {
    name: String,
    policy: String,
    all_allowed: bool,
    deny: Vec<String>,
    allow: Vec<String>,
}

impl PrivilegeDef {
    pub fn new(
        name: impl Into<String>,
        policy: impl Into<String>,
        all_allowed: bool,
        deny: Vec<String>,
        allow: Vec<String>,
    ) -> PrivilegeResult<Self> {
        let name = name.into();
        let policy = policy.into();
        require_name("privilege", &name)?;
        if policy.trim().is_empty() {
            return Err(PrivilegeError::validation(
                "empty_policy".to_string(),
                format!("privilege {} has no policy", name),
            ));
        }
        check_entries(&name, "deny", &deny)?;
        check_entries(&name, "allow", &allow)?;
        Ok(Self { name, policy, all_allowed, deny, allow })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn policy(&self) -> &str { &self.policy }
    pub fn all_allowed(&self) -> bool { self.all_allowed }
    pub fn deny_list(&self) -> &[String] { &self.deny }
    pub fn allow_list(&self) -> &[String] { &self.allow }
}

fn check_entries(name: &str, list: &str, entries: &[String]) -> PrivilegeResult<()> {
    if entries.iter().any(|e| e.trim().is_empty()) {
        return Err(PrivilegeError::validation(
            format!("empty_{}_value", list),
            format!("privilege {} has an empty {} value", name, list),
        ));
    }
    Ok(())
}
