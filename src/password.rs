//! One-way password hashing.
//!
//! Argon2id in PHC string format. Hashing is CPU-bound, so both operations run
//! on the blocking pool rather than on the async workers.

use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier, Version};
use async_trait::async_trait;
use password_hash::{PasswordHash, SaltString};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plain: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` for a wrong password or an unparseable stored hash.
    async fn verify(&self, hash: &str, plain: &str) -> Result<bool, PasswordError>;
}

#[derive(Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost parameters (memory in KiB, iterations, parallelism).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    async fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let argon2 = self.argon2.clone();
        let plain = plain.to_string();

        tokio::task::spawn_blocking(move || {
            let mut salt_bytes = [0u8; 16];
            rand::RngCore::fill_bytes(&mut rand::rng(), &mut salt_bytes);
            let salt = SaltString::encode_b64(&salt_bytes)
                .map_err(|e| PasswordError::Hash(e.to_string()))?;

            argon2
                .hash_password(plain.as_bytes(), &salt)
                .map(|phc| phc.to_string())
                .map_err(|e| PasswordError::Hash(e.to_string()))
        })
        .await?
    }

    async fn verify(&self, hash: &str, plain: &str) -> Result<bool, PasswordError> {
        let argon2 = self.argon2.clone();
        let hash = hash.to_string();
        let plain = plain.to_string();

        let ok = tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed) => argon2.verify_password(plain.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        })
        .await?;
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(64, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("secret1").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(&hash, "secret1").await.unwrap());
        assert!(!hasher.verify(&hash, "secret2").await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("secret1").await.unwrap();
        let second = hasher.hash("secret1").await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_verify() {
        assert!(!hasher().verify("DEV_PASSWORD_admin123", "admin123").await.unwrap());
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(Argon2Hasher::with_params(1, 0, 1).is_err());
    }
}
