//! Role/privilege decision engine.
//!
//! Roles gate whether a privilege may be consulted at all; the decision itself
//! comes from the single global privilege definition and its policy, so every
//! role granting the same privilege yields the same answer.

use std::sync::Arc;

use tracing::debug;

use crate::error::{PrivilegeError, PrivilegeResult};
use crate::model::{Principal, Restrictable};
use crate::policy::PolicyRegistry;
use crate::store::CredentialStore;

#[derive(Clone)]
pub struct AuthorizationEngine {
    store: Arc<dyn CredentialStore>,
    policies: Arc<PolicyRegistry>,
}

impl AuthorizationEngine {
    pub fn new(store: Arc<dyn CredentialStore>, policies: Arc<PolicyRegistry>) -> Self {
        Self { store, policies }
    }

    pub fn policies(&self) -> &PolicyRegistry { &self.policies }

    /// Decide whether `principal` may perform `action`.
    ///
    /// * `Err(AccessDenied)` when none of the principal's roles grants the privilege.
    /// * `Err(Internal)` when any of the principal's roles is undefined, the
    ///   privilege is undefined, or it names an unregistered policy.
    /// * `Ok(false)` when the policy refuses the value.
    pub fn is_allowed(&self, principal: &Principal, action: &dyn Restrictable) -> PrivilegeResult<bool> {
        let privilege_name = action.privilege_name();
        let value = action.privilege_value();

        // Every role is resolved first so an undefined one always surfaces.
        let mut granting_role = None;
        for role_name in principal.roles().iter() {
            let Some(role) = self.store.get_role(role_name) else {
                return Err(PrivilegeError::internal(
                    "undefined_role".to_string(),
                    format!("principal {} references undefined role {}", principal.name(), role_name),
                ));
            };
            if granting_role.is_none() && role.has_privilege(privilege_name) {
                granting_role = Some(role);
            }
        }
        let Some(role) = granting_role else {
            debug!(
                target: "privguard::authz",
                "deny user={} privilege={} reason=no_role",
                principal.name(),
                privilege_name
            );
            return Err(PrivilegeError::access_denied(
                "privilege_not_granted".to_string(),
                format!("{} does not hold a role granting {}", principal.name(), privilege_name),
            ));
        };

        // One snapshot of the definition is evaluated; a concurrent replace affects the next call.
        let Some(privilege) = self.store.get_privilege(privilege_name) else {
            return Err(PrivilegeError::internal(
                "undefined_privilege".to_string(),
                format!("role {} references undefined privilege {}", role.name(), privilege_name),
            ));
        };
        let evaluator = self.policies.get(privilege.policy())?;
        let allowed = evaluator.evaluate(&privilege, value);
        debug!(
            target: "privguard::authz",
            "decision user={} privilege={} policy={} allowed={}",
            principal.name(),
            privilege_name,
            privilege.policy(),
            allowed
        );
        Ok(allowed)
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine").field("policies", &self.policies).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "authz_tests.rs"]
mod authz_tests;
