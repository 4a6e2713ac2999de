//! Pluggable allow/deny evaluation, selected per privilege by its policy identifier.
//!
//! Every evaluator must keep deny-overrides-allow precedence: a value matched by
//! the deny list is refused even when `all_allowed` is set or the allow list
//! also matches it.

mod default;
mod glob;

pub use default::DefaultPolicy;
pub use glob::GlobPolicy;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{PrivilegeError, PrivilegeResult};
use crate::model::PrivilegeDef;

pub const DEFAULT_POLICY: &str = "DefaultPrivilege";
pub const GLOB_POLICY: &str = "GlobPrivilege";

pub trait PolicyEvaluator: Send + Sync {
    /// `true` grants `value` under `privilege`.
    fn evaluate(&self, privilege: &PrivilegeDef, value: &str) -> bool;
}

/// Maps policy identifiers to evaluators. Built once, then shared read-only.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    evaluators: HashMap<String, Arc<dyn PolicyEvaluator>>,
}

impl PolicyRegistry {
    pub fn empty() -> Self { Self::default() }

    /// Registry with `DefaultPrivilege` and `GlobPrivilege`.
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.evaluators.insert(DEFAULT_POLICY.to_string(), Arc::new(DefaultPolicy));
        reg.evaluators.insert(GLOB_POLICY.to_string(), Arc::new(GlobPolicy::new()));
        reg
    }

    pub fn register(&mut self, id: impl Into<String>, evaluator: Arc<dyn PolicyEvaluator>) -> PrivilegeResult<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PrivilegeError::internal("empty_policy_id", "policy identifier must not be empty"));
        }
        if self.evaluators.contains_key(&id) {
            return Err(PrivilegeError::internal(
                "duplicate_policy".to_string(),
                format!("policy {} is already registered", id),
            ));
        }
        self.evaluators.insert(id, evaluator);
        Ok(())
    }

    /// Unknown identifiers are a configuration fault, not a denial.
    pub fn get(&self, id: &str) -> PrivilegeResult<Arc<dyn PolicyEvaluator>> {
        self.evaluators.get(id).cloned().ok_or_else(|| {
            PrivilegeError::internal("unknown_policy".to_string(), format!("no policy registered under {}", id))
        })
    }

    pub fn contains(&self, id: &str) -> bool { self.evaluators.contains_key(id) }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.evaluators.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry").field("ids", &self.ids()).finish()
    }
}
