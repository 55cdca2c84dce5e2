use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::AppError;

/// Salt bounds in bytes; 48 bytes is the longest salt that fits a PHC string.
const MIN_SALT_LEN: usize = 8;
const MAX_SALT_LEN: usize = 48;

/// Argon2id cost parameters. Fixed per vault, never chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub salt_len: usize,
    pub output_len: usize,
}

impl HashParams {
    /// Cost suited to interactive logins.
    pub const INTERACTIVE: HashParams = HashParams {
        memory_kib: 32 * 1024,
        iterations: 3,
        parallelism: 1,
        salt_len: 16,
        output_len: 30,
    };
}

impl Default for HashParams {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

/// Salted, memory-hard password hashing.
#[derive(Debug, Clone)]
pub struct PasswordVault {
    params: HashParams,
    argon_params: Params,
}

impl PasswordVault {
    pub fn new(params: HashParams) -> Result<Self, AppError> {
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&params.salt_len) {
            return Err(AppError::Crypto(format!(
                "salt length {} outside supported range",
                params.salt_len
            )));
        }

        let argon_params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            Some(params.output_len),
        )
        .map_err(|e| AppError::Crypto(format!("invalid hash parameters: {e}")))?;

        Ok(Self {
            params,
            argon_params,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.argon_params.clone())
    }

    pub fn params(&self) -> &HashParams {
        &self.params
    }

    /// Self-describing PHC string carrying algorithm, parameters and salt.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = self.salt()?;
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Crypto(format!("hashing failed: {e}")))
    }

    /// `Ok(false)` only for a wrong password. A malformed hash is an error.
    pub fn verify(&self, password: &str, salted_hash: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(salted_hash)
            .map_err(|e| AppError::Crypto(format!("stored hash is malformed: {e}")))?;

        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Crypto(format!("verification failed: {e}"))),
        }
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || vault.hash(&password))
            .await
            .map_err(|e| AppError::Crypto(format!("hashing task failed: {e}")))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(
        &self,
        password: String,
        salted_hash: String,
    ) -> Result<bool, AppError> {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || vault.verify(&password, &salted_hash))
            .await
            .map_err(|e| AppError::Crypto(format!("verification task failed: {e}")))?
    }

    fn salt(&self) -> Result<SaltString, AppError> {
        let mut bytes = vec![0u8; self.params.salt_len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::Crypto(format!("entropy source failed: {e}")))?;
        SaltString::encode_b64(&bytes).map_err(|e| AppError::Crypto(format!("salt encoding: {e}")))
    }
}
