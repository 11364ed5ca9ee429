//! One-way password hashing.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::error::AuthError;

/// Hashes plaintext passwords and checks them against stored hashes.
pub trait PasswordHasher: Send + Sync {
    /// Hash `plaintext` with a fresh random salt.
    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;

    /// Whether `plaintext` matches `hash`. Malformed hashes never match.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Argon2id hashing producing PHC strings (`$argon2id$v=19$...`).
#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Use explicit cost parameters (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, AuthError> {
        let params = Params::new(m_cost, t_cost, p_cost, None).map_err(|e| {
            tracing::warn!(%e, "rejected argon2 parameters");
            AuthError::InvalidCredentials
        })?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt).map_err(|_| AuthError::InvalidCredentials)?;

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::InvalidCredentials)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                self.argon2
                    .verify_password(plaintext.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Argon2Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Hasher").finish_non_exhaustive()
    }
}
