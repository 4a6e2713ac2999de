//! Data model for principals, roles, privilege definitions and credentials.
//! Values here are immutable once built; stores hand them out as `Arc` snapshots.

mod principal;
mod role;
mod privilege;
mod action;
mod credential;

pub use principal::{Principal, PrincipalRep, UserState};
pub use role::Role;
pub use privilege::PrivilegeDef;
pub use action::{ProtectedAction, Restrictable};
pub use credential::{Credential, Session};

use crate::error::{PrivilegeError, PrivilegeResult};

/// Reject empty names with a validation fault naming `what`.
pub(crate) fn require_name(what: &str, name: &str) -> PrivilegeResult<()> {
    if name.trim().is_empty() {
        return Err(PrivilegeError::validation(
            format!("empty_{}_name", what),
            format!("{} name must not be empty", what),
        ));
    }
    Ok(())
}
