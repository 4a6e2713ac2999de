//! Session lifecycle: authentication, credential issuance, tamper checks, logout.
//! The table and its bookkeeping live in `manager`.

mod manager;

pub use manager::SessionManager;
pub use crate::config::SessionConfig;
