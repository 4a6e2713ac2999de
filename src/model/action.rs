use serde::{Deserialize, Serialize};

/// Something a caller wants to do: the privilege it needs and the value
/// tested against that privilege's allow/deny lists.
pub trait Restrictable {
    fn privilege_name(&self) -> &str;
    fn privilege_value(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProtectedAction {
    pub privilege: String,
    pub value: String,
}

impl ProtectedAction {
    pub fn new(privilege: impl Into<String>, value: impl Into<String>) -> Self {
        Self { privilege: privilege.into(), value: value.into() }
    }
}

impl Restrictable for ProtectedAction {
    fn privilege_name(&self) -> &str { &self.privilege }
    fn privilege_value(&self) -> &str { &self.value }
}

impl<T: Restrictable + ?Sized> Restrictable for &T {
    fn privilege_name(&self) -> &str { (**self).privilege_name() }
    fn privilege_value(&self) -> &str { (**self).privilege_value() }
}
