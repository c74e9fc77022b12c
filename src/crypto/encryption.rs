//! AES-256-GCM envelopes
//!
//! An [`Envelope`] is the only shape encrypted data takes anywhere in the
//! crate. Each seal draws a fresh 96-bit nonce from the OS generator.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

use super::key_derivation::SessionKey;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag appended to the ciphertext
pub const TAG_SIZE: usize = 16;

/// Algorithm tag carried by every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CipherAlgorithm {
    #[default]
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
}

/// Authenticated ciphertext with the nonce it was sealed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Ciphertext followed by the authentication tag (base64 encoded)
    pub ciphertext: String,
    /// The nonce used for this encryption (base64 encoded)
    pub nonce: String,
    #[serde(default)]
    pub algorithm: CipherAlgorithm,
}

impl Envelope {
    fn new(nonce: &[u8], ciphertext: &[u8]) -> Self {
        Self {
            ciphertext: STANDARD.encode(ciphertext),
            nonce: STANDARD.encode(nonce),
            algorithm: CipherAlgorithm::Aes256Gcm,
        }
    }

    /// Build an envelope from raw nonce and ciphertext bytes
    pub fn from_parts(nonce: &[u8], ciphertext: &[u8]) -> Self {
        Self::new(nonce, ciphertext)
    }

    /// Decode the nonce from base64
    pub fn nonce_bytes(&self) -> VaultResult<Vec<u8>> {
        STANDARD
            .decode(&self.nonce)
            .map_err(|e| VaultError::Decryption(format!("Invalid nonce encoding: {}", e)))
    }

    /// Decode the ciphertext (including tag) from base64
    pub fn ciphertext_bytes(&self) -> VaultResult<Vec<u8>> {
        STANDARD
            .decode(&self.ciphertext)
            .map_err(|e| VaultError::Decryption(format!("Invalid ciphertext encoding: {}", e)))
    }
}

fn cipher_for(key: &SessionKey) -> VaultResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("Failed to create cipher: {}", e)))
}

/// Encrypt plaintext under the session key with a fresh random nonce
pub fn seal(plaintext: &[u8], key: &SessionKey) -> VaultResult<Envelope> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Encryption(format!("Encryption failed: {}", e)))?;

    Ok(Envelope::new(&nonce_bytes, &ciphertext))
}

/// Verify and decrypt an envelope
///
/// Any malformed field is reported as a decryption failure: a record that
/// cannot be opened is indistinguishable from a tampered one.
pub fn open(envelope: &Envelope, key: &SessionKey) -> VaultResult<Vec<u8>> {
    let cipher = cipher_for(key)?;

    let nonce_bytes = envelope.nonce_bytes()?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(VaultError::Decryption(format!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        )));
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = envelope.ciphertext_bytes()?;
    if ciphertext.len() < TAG_SIZE {
        return Err(VaultError::Decryption("Ciphertext shorter than tag".into()));
    }

    cipher.decrypt(nonce, ciphertext.as_ref()).map_err(|_| {
        VaultError::Decryption("authentication failed: invalid key or corrupted data".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_derivation::{derive_key, KeyDerivationParams};

    fn test_key() -> SessionKey {
        let params = KeyDerivationParams::with_iterations(1_000);
        derive_key("test_passphrase", &params).unwrap()
    }

    #[test]
    fn test_seal_open() {
        let key = test_key();
        let plaintext = b"Hello, World!";

        let envelope = seal(plaintext, &key).unwrap();
        let opened = open(&envelope, &key).unwrap();

        assert_eq!(plaintext, opened.as_slice());
        assert_eq!(envelope.algorithm, CipherAlgorithm::Aes256Gcm);
    }

    #[test]
    fn test_different_nonces() {
        let key = test_key();
        let plaintext = b"Hello, World!";

        let e1 = seal(plaintext, &key).unwrap();
        let e2 = seal(plaintext, &key).unwrap();

        assert_ne!(e1.nonce, e2.nonce);
        assert_ne!(e1.ciphertext, e2.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = test_key();
        let key2 = test_key();

        let envelope = seal(b"Hello, World!", &key1).unwrap();

        let result = open(&envelope, &key2);
        assert!(matches!(result, Err(VaultError::Decryption(_))));
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let key = test_key();
        let envelope = seal(b"bits", &key).unwrap();
        let raw = envelope.ciphertext_bytes().unwrap();
        let nonce = envelope.nonce_bytes().unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let forged = Envelope::from_parts(&nonce, &tampered);
                assert!(
                    matches!(open(&forged, &key), Err(VaultError::Decryption(_))),
                    "flip at byte {} bit {} was accepted",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let key = test_key();
        let envelope = seal(b"payload", &key).unwrap();
        let mut nonce = envelope.nonce_bytes().unwrap();
        nonce[0] ^= 0x01;
        let forged = Envelope::from_parts(&nonce, &envelope.ciphertext_bytes().unwrap());

        assert!(open(&forged, &key).unwrap_err().is_decryption());
    }

    #[test]
    fn test_malformed_fields_are_decryption_errors() {
        let key = test_key();
        let mut envelope = seal(b"payload", &key).unwrap();
        envelope.nonce = "not base64!!".into();
        assert!(open(&envelope, &key).unwrap_err().is_decryption());

        let short = Envelope::from_parts(&[0u8; NONCE_SIZE], &[1, 2, 3]);
        assert!(open(&short, &key).unwrap_err().is_decryption());
    }

    #[test]
    fn test_empty_plaintext() {
        let key = test_key();
        let envelope = seal(b"", &key).unwrap();
        assert!(open(&envelope, &key).unwrap().is_empty());
    }

    #[test]
    fn test_large_plaintext() {
        let key = test_key();
        let plaintext: Vec<u8> = (0..10000).map(|i| (i % 256) as u8).collect();

        let envelope = seal(&plaintext, &key).unwrap();
        assert_eq!(plaintext, open(&envelope, &key).unwrap());
    }

    #[test]
    fn test_envelope_json_shape() {
        let key = test_key();
        let envelope = seal(b"x", &key).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["algorithm"], "AES-256-GCM");
        assert!(value["nonce"].is_string());
        assert!(value["ciphertext"].is_string());
    }
}
