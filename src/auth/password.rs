//! Password Hashing Service
//!
//! Argon2id with a per-password random salt. Hashes are PHC strings, so the
//! parameters travel with the hash and old hashes keep verifying after the
//! cost settings change.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};

use crate::config::HashingConfig;
use crate::error::AuthError;

pub(crate) const DUMMY_PASSWORD: &str = "session-gate/no-such-account";

#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    /// Hash with the configured cost, verified when no account matched so
    /// unknown emails take as long as wrong passwords.
    dummy_hash: Arc<str>,
}

impl PasswordService {
    pub fn new(config: HashingConfig) -> Result<Self, AuthError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AuthError::Hash(format!("invalid argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(DUMMY_PASSWORD.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();
        Ok(Self {
            argon2,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Derive a salted hash for `plaintext`.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    /// Checks `plaintext` against a stored PHC hash. Unparseable hashes never match.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Stored password hash is malformed: {}", e);
                return false;
            }
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// `hash` on the blocking pool; argon2 is CPU-bound by construction.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, AuthError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Hash(format!("hashing task failed: {e}")))?
    }

    /// Full-cost verification against the dummy hash. Called when no account
    /// matched so the response time does not reveal that; the result is discarded.
    pub async fn verify_unknown_blocking(&self, plaintext: String) {
        let stored_hash = self.dummy_hash.to_string();
        self.verify_blocking(plaintext, stored_hash).await;
    }

    pub async fn verify_blocking(&self, plaintext: String, stored_hash: String) -> bool {
        let service = self.clone();
        match tokio::task::spawn_blocking(move || service.verify(&plaintext, &stored_hash)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!("Password verification task failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_service() -> PasswordService {
    PasswordService::new(HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("test argon2 params")
}
