use std::collections::HashMap;

use parking_lot::RwLock;
use regex::Regex;

use super::PolicyEvaluator;
use crate::model::PrivilegeDef;

/// List entries are glob patterns: `*` matches within one `/` segment,
/// `**` matches across segments. Same precedence as the default policy.
#[derive(Debug, Default)]
pub struct GlobPolicy {
    // Compiled patterns keyed by their source text.
    compiled: RwLock<HashMap<String, Regex>>,
}

impl GlobPolicy {
    pub fn new() -> Self { Self::default() }

    fn matches(&self, pattern: &str, value: &str) -> bool {
        if let Some(rx) = self.compiled.read().get(pattern) {
            return rx.is_match(value);
        }
        match glob_to_regex(pattern) {
            Some(rx) => {
                let hit = rx.is_match(value);
                let mut cache = self.compiled.write();
                // Patterns come from privilege definitions, so the set is small; reset if it grows anyway.
                if cache.len() >= 4096 { cache.clear(); }
                cache.insert(pattern.to_string(), rx);
                hit
            }
            None => pattern == value,
        }
    }
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    // Escape regex meta, then restore wildcards: ** -> .*, * -> [^/]*
    let mut s = regex::escape(pattern);
    s = s.replace("\\*\\*", ".*");
    s = s.replace("\\*", "[^/]*");
    Regex::new(&format!("^{}$", s)).ok()
}

impl PolicyEvaluator for GlobPolicy {
    fn evaluate(&self, privilege: &PrivilegeDef, value: &str) -> bool {
        if privilege.deny_list().iter().any(|d| self.matches(d, value)) {
            return false;
        }
        if privilege.all_allowed() {
            return true;
        }
        privilege.allow_list().iter().any(|a| self.matches(a, value))
    }
}
