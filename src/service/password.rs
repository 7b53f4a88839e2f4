use crate::config::PasswordConfig;
use crate::error::app_error::AppError;
use argon2::{Algorithm, Argon2, Version};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};

/// Argon2id hashing with configurable cost. Work runs on the blocking pool.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Real hash of a throwaway password, verified against when the account
    /// does not exist so both login failure paths take the same time.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, AppError> {
        let params = config
            .argon2_params()
            .map_err(|e| AppError::PasswordHash {
                message: format!("Invalid Argon2 parameters: {}", e),
            })?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "dummy-never-matches")?;

        Ok(Self { argon2, dummy_hash })
    }

    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_with(&argon2, &password))
            .await
            .map_err(|e| AppError::PasswordHash {
                message: format!("Task join error: {}", e),
            })?
    }

    /// `InvalidCredentials` on mismatch; an unparsable stored hash is an internal error.
    pub async fn verify(&self, stored_hash: &str, password: &str) -> Result<(), AppError> {
        let argon2 = self.argon2.clone();
        let stored_hash = stored_hash.to_string();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || verify_with(&argon2, &stored_hash, &password))
            .await
            .map_err(|e| AppError::PasswordHash {
                message: format!("Task join error: {}", e),
            })?
    }

    /// Throwaway verification to equalize response timing for unknown accounts.
    pub async fn dummy_verify(&self, password: &str) {
        let _ = self.verify(&self.dummy_hash, password).await;
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::password_hash("Failed to hash password", e))?;
    Ok(hash.to_string())
}

fn verify_with(argon2: &Argon2<'_>, stored_hash: &str, password: &str) -> Result<(), AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;
    argon2
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::InvalidCredentials)
}
