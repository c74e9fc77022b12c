//! Key derivation using PBKDF2-HMAC-SHA256
//!
//! Turns a passphrase and a random salt into the 256-bit session key. The
//! iteration count is recorded next to the salt so a later unlock reproduces
//! exactly the key produced at setup.

use base64::{engine::general_purpose::STANDARD, Engine};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use aes_gcm::aead::{rand_core::RngCore, OsRng};

use crate::error::{VaultError, VaultResult};

/// Lowest iteration count accepted for new setups
pub const MIN_ITERATIONS: u32 = 600_000;

/// Salt length in bytes
pub const SALT_SIZE: usize = 16;

/// Session key length in bytes (AES-256)
pub const KEY_SIZE: usize = 32;

/// Key derivation function identifier stored with the salt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum KdfAlgorithm {
    #[default]
    #[serde(rename = "pbkdf2-sha256")]
    Pbkdf2Sha256,
}

/// Parameters for key derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDerivationParams {
    /// Salt for key derivation (base64 encoded)
    pub salt: String,
    /// PBKDF2 iteration count
    pub iterations: u32,
    #[serde(default)]
    pub algorithm: KdfAlgorithm,
}

impl KeyDerivationParams {
    /// Create new params with a random salt and the default iteration count
    pub fn new() -> Self {
        Self::with_iterations(MIN_ITERATIONS)
    }

    /// Create params with a random salt and a specific iteration count
    ///
    /// Counts below [`MIN_ITERATIONS`] are only meant for tests; the settings
    /// layer refuses them for real setups.
    pub fn with_iterations(iterations: u32) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        Self {
            salt: STANDARD.encode(salt),
            iterations,
            algorithm: KdfAlgorithm::Pbkdf2Sha256,
        }
    }

    fn decode_salt(&self) -> VaultResult<Vec<u8>> {
        let salt = STANDARD
            .decode(&self.salt)
            .map_err(|e| VaultError::Setup(format!("Invalid salt encoding: {}", e)))?;
        if salt.len() < SALT_SIZE {
            return Err(VaultError::Setup(format!(
                "Salt too short: expected at least {} bytes, got {}",
                SALT_SIZE,
                salt.len()
            )));
        }
        Ok(salt)
    }
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self::new()
    }
}

/// The in-memory session key
///
/// Zeroized on drop. Deliberately neither `Clone` nor serializable.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    key: [u8; KEY_SIZE],
}

impl SessionKey {
    pub(crate) fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// Derive the session key from a passphrase
///
/// This is slow on purpose. Async callers should run it on a blocking thread.
pub fn derive_key(passphrase: &str, params: &KeyDerivationParams) -> VaultResult<SessionKey> {
    if params.iterations == 0 {
        return Err(VaultError::Setup("Iteration count must be positive".into()));
    }
    let salt = params.decode_salt()?;

    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &salt, params.iterations, &mut key);

    let session_key = SessionKey::from_bytes(key);
    key.zeroize();
    Ok(session_key)
}
