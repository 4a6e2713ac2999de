//! Error model shared by every privguard operation.
//! Four kinds in increasing severity: caller input, refused access, tampered
//! credentials and broken deployment data. None of them is ever retried.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrivilegeError {
    /// Malformed caller input (e.g. a secret shorter than the configured minimum).
    Validation { code: String, message: String },
    /// Well-formed request that is correctly refused.
    AccessDenied { code: String, message: String },
    /// Credential failed the tamper checks.
    Integrity { code: String, message: String },
    /// Data inconsistency that should be structurally impossible.
    Internal { code: String, message: String },
}

/// Code used for every authentication failure so the sub-check stays hidden.
pub const INVALID_CREDENTIALS: &str = "invalid_credentials";

impl PrivilegeError {
    pub fn code_str(&self) -> &str {
        match self {
            PrivilegeError::Validation { code, .. }
            | PrivilegeError::AccessDenied { code, .. }
            | PrivilegeError::Integrity { code, .. }
            | PrivilegeError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PrivilegeError::Validation { message, .. }
            | PrivilegeError::AccessDenied { message, .. }
            | PrivilegeError::Integrity { message, .. }
            | PrivilegeError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { PrivilegeError::Validation { code: code.into(), message: msg.into() } }
    pub fn access_denied<S: Into<String>>(code: S, msg: S) -> Self { PrivilegeError::AccessDenied { code: code.into(), message: msg.into() } }
    pub fn integrity<S: Into<String>>(code: S, msg: S) -> Self { PrivilegeError::Integrity { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { PrivilegeError::Internal { code: code.into(), message: msg.into() } }

    /// The single error every failed `authenticate` returns.
    pub fn invalid_credentials() -> Self {
        PrivilegeError::access_denied(INVALID_CREDENTIALS, "invalid credentials")
    }

    /// Static label of the error kind, stable for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PrivilegeError::Validation { .. } => "validation",
            PrivilegeError::AccessDenied { .. } => "access_denied",
            PrivilegeError::Integrity { .. } => "integrity",
            PrivilegeError::Internal { .. } => "internal",
        }
    }

    /// Severity rank; higher is worse.
    pub fn severity(&self) -> u8 {
        match self {
            PrivilegeError::Validation { .. } => 1,
            PrivilegeError::AccessDenied { .. } => 2,
            PrivilegeError::Integrity { .. } => 3,
            PrivilegeError::Internal { .. } => 4,
        }
    }

    /// `true` for "bad caller" errors, `false` for tampering and "bad deployment".
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, PrivilegeError::Validation { .. } | PrivilegeError::AccessDenied { .. })
    }

    pub fn is_access_denied(&self) -> bool { matches!(self, PrivilegeError::AccessDenied { .. }) }
    pub fn is_integrity(&self) -> bool { matches!(self, PrivilegeError::Integrity { .. }) }
    pub fn is_internal(&self) -> bool { matches!(self, PrivilegeError::Internal { .. }) }
    pub fn is_validation(&self) -> bool { matches!(self, PrivilegeError::Validation { .. }) }

    /// Map to an HTTP status code for hosts that front the core with HTTP.
    pub fn http_status(&self) -> u16 {
        match self {
            PrivilegeError::Validation { .. } => 400,
            PrivilegeError::AccessDenied { .. } => 403,
            PrivilegeError::Integrity { .. } => 401,
            PrivilegeError::Internal { .. } => 500,
        }
    }
}

impl Display for PrivilegeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for PrivilegeError {}

pub type PrivilegeResult<T> = Result<T, PrivilegeError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
