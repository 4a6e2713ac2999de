use super::PolicyEvaluator;
use crate::model::PrivilegeDef;

/// Exact, case-sensitive matching of the value against the lists.
///
/// 1. value in deny list: deny
/// 2. `all_allowed`: allow
/// 3. value in allow list: allow
/// 4. otherwise deny
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl PolicyEvaluator for DefaultPolicy {
    fn evaluate(&self, privilege: &PrivilegeDef, value: &str) -> bool {
        if privilege.deny_list().iter().any(|d| d == value) {
            return false;
        }
        if privilege.all_allowed() {
            return true;
        }
        privilege.allow_list().iter().any(|a| a == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn def(all_allowed: bool, deny: &[&str], allow: &[&str]) -> PrivilegeDef {
        PrivilegeDef::new(
            "export",
            super::super::DEFAULT_POLICY,
            all_allowed,
            deny.iter().map(|s| s.to_string()).collect(),
            allow.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn export_scenario() {
        let p = def(false, &["reports-confidential"], &["reports"]);
        assert!(DefaultPolicy.evaluate(&p, "reports"));
        assert!(!DefaultPolicy.evaluate(&p, "reports-confidential"));
        assert!(!DefaultPolicy.evaluate(&p, "other"));
    }

    #[test]
    fn all_allowed_without_deny() {
        let p = def(true, &[], &[]);
        assert!(DefaultPolicy.evaluate(&p, "bob"));
    }

    #[test]
    fn matching_is_exact() {
        let p = def(false, &[], &["reports"]);
        assert!(!DefaultPolicy.evaluate(&p, "Reports"));
        assert!(!DefaultPolicy.evaluate(&p, "reports "));
    }

    proptest! {
        #[test]
        fn deny_beats_all_allowed_and_allow(value in "[a-z0-9-]{1,16}", extra in proptest::collection::vec("[a-z]{1,8}", 0..4)) {
            let mut allow: Vec<&str> = extra.iter().map(String::as_str).collect();
            allow.push(value.as_str());
            let p = def(true, &[value.as_str()], &allow);
            prop_assert!(!DefaultPolicy.evaluate(&p, &value));
        }

        #[test]
        fn default_closed(value in "[a-z]{1,12}", deny in proptest::collection::vec("[A-Z]{1,8}", 0..4), allow in proptest::collection::vec("[A-Z]{1,8}", 0..4)) {
            let deny: Vec<&str> = deny.iter().map(String::as_str).collect();
            let allow: Vec<&str> = allow.iter().map(String::as_str).collect();
            let p = def(false, &deny, &allow);
            prop_assert!(!DefaultPolicy.evaluate(&p, &value));
        }
    }
}
