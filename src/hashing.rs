//! Password digests and opaque token generation.

use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use base64::Engine;
use password_hash::SaltString;
use subtle::ConstantTimeEq;

use crate::config::HashingConfig;
use crate::error::{PrivilegeError, PrivilegeResult};

/// Produces one-way secret digests and unpredictable tokens.
///
/// `hash` must be deterministic: the same secret always yields the same digest,
/// since authentication compares digests directly.
pub trait HashingProvider: Send + Sync {
    fn hash(&self, secret: &str) -> PrivilegeResult<String>;
    fn next_token(&self) -> PrivilegeResult<String>;
}

/// Argon2id with a deployment-wide salt. The digest is the PHC string.
pub struct Argon2Provider {
    argon2: Argon2<'static>,
    salt: SaltString,
}

impl Argon2Provider {
    pub fn new(cfg: &HashingConfig) -> PrivilegeResult<Self> {
        if cfg.salt.len() < 8 {
            return Err(PrivilegeError::internal(
                "bad_hash_salt".to_string(),
                format!("salt must be at least 8 bytes, got {}", cfg.salt.len()),
            ));
        }
        let salt = SaltString::encode_b64(&cfg.salt)
            .map_err(|e| PrivilegeError::internal("bad_hash_salt".to_string(), e.to_string()))?;
        let params = Params::new(cfg.m_cost, cfg.t_cost, cfg.p_cost, None)
            .map_err(|e| PrivilegeError::internal("bad_hash_params".to_string(), e.to_string()))?;
        Ok(Self { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params), salt })
    }

    pub fn from_env() -> PrivilegeResult<Self> {
        Self::new(&HashingConfig::from_env()?)
    }
}

impl std::fmt::Debug for Argon2Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Provider").finish_non_exhaustive()
    }
}

impl HashingProvider for Argon2Provider {
    fn hash(&self, secret: &str) -> PrivilegeResult<String> {
        let phc = self
            .argon2
            .hash_password(secret.as_bytes(), &self.salt)
            .map_err(|e| PrivilegeError::internal("hash_failed".to_string(), e.to_string()))?
            .to_string();
        Ok(phc)
    }

    fn next_token(&self) -> PrivilegeResult<String> {
        random_token()
    }
}

/// 256-bit random value, base64url without padding.
pub fn random_token() -> PrivilegeResult<String> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf)
        .map_err(|e| PrivilegeError::internal("rng_unavailable".to_string(), e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Constant-time string equality for digests and tokens.
pub fn secure_eq(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
