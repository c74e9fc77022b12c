//! Envelope encryption under the active session key
//!
//! [`EnvelopeCipher`] is stateless apart from its handle on the
//! [`KeyManager`]; it never persists anything. Every call needs an unlocked
//! session and fails with [`VaultError::Locked`] otherwise.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

use super::encryption::{open, seal, Envelope};
use super::key_manager::KeyManager;

/// Authenticated encryption of arbitrary payloads
#[derive(Debug, Clone)]
pub struct EnvelopeCipher {
    keys: Arc<KeyManager>,
}

impl EnvelopeCipher {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Encrypt bytes with a fresh nonce
    pub async fn encrypt(&self, plaintext: &[u8]) -> VaultResult<Envelope> {
        self.keys.with_key(|key| seal(plaintext, key)).await
    }

    /// Verify and decrypt bytes; nothing is returned unless the tag verifies
    pub async fn decrypt(&self, envelope: &Envelope) -> VaultResult<Zeroizing<Vec<u8>>> {
        self.keys
            .with_key(|key| open(envelope, key))
            .await
            .map(Zeroizing::new)
    }

    pub async fn encrypt_str(&self, plaintext: &str) -> VaultResult<Envelope> {
        self.encrypt(plaintext.as_bytes()).await
    }

    pub async fn decrypt_string(&self, envelope: &Envelope) -> VaultResult<String> {
        let plaintext = self.decrypt(envelope).await?;
        String::from_utf8(plaintext.to_vec()).map_err(|_| {
            VaultError::Decryption("decrypted payload is not valid UTF-8".into())
        })
    }

    /// Serialize to JSON and encrypt; the intermediate buffer is wiped
    pub async fn encrypt_json<T: Serialize>(&self, value: &T) -> VaultResult<Envelope> {
        let json = Zeroizing::new(serde_json::to_vec(value)?);
        self.encrypt(&json).await
    }

    /// Decrypt and deserialize JSON
    pub async fn decrypt_json<T: DeserializeOwned>(&self, envelope: &Envelope) -> VaultResult<T> {
        let plaintext = self.decrypt(envelope).await?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            VaultError::Decryption(format!("decrypted payload is not the expected shape: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::collections::HashSet;

    async fn unlocked_cipher() -> EnvelopeCipher {
        let keys = Arc::new(KeyManager::with_iterations(Arc::new(MemoryStore::new()), 1_000));
        keys.initialize().await.unwrap();
        keys.setup_passphrase("cipher tests".into()).await.unwrap();
        EnvelopeCipher::new(keys)
    }

    #[tokio::test]
    async fn test_round_trip_bytes_and_json() {
        let cipher = unlocked_cipher().await;

        let payloads: [&[u8]; 3] = [b"", b"a", b"\x00\xff\x10binary"];
        for payload in payloads {
            let envelope = cipher.encrypt(payload).await.unwrap();
            assert_eq!(cipher.decrypt(&envelope).await.unwrap().as_slice(), payload);
        }

        let value = json!({"nested": {"list": [1, 2, 3]}, "text": "ünïcode"});
        let envelope = cipher.encrypt_json(&value).await.unwrap();
        let back: serde_json::Value = cipher.decrypt_json(&envelope).await.unwrap();
        assert_eq!(back, value);
    }

    #[tokio::test]
    async fn test_ciphertext_hides_markers() {
        let cipher = unlocked_cipher().await;
        let marker = "UNIQUE-MARKER-7f3c9a";
        let payload = json!({"title": marker, "answers": {"q1": marker}});

        let envelope = cipher.encrypt_json(&payload).await.unwrap();
        let raw = envelope.ciphertext_bytes().unwrap();
        let serialized = serde_json::to_string(&envelope).unwrap();

        assert!(!serialized.contains(marker));
        assert!(!raw
            .windows(marker.len())
            .any(|window| window == marker.as_bytes()));
    }

    #[tokio::test]
    async fn test_nonces_never_repeat() {
        let cipher = unlocked_cipher().await;
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let envelope = cipher.encrypt(b"same plaintext").await.unwrap();
            assert!(seen.insert(envelope.nonce), "nonce reused");
        }
    }

    #[tokio::test]
    async fn test_locked_cipher_refuses() {
        let cipher = unlocked_cipher().await;
        let envelope = cipher.encrypt(b"x").await.unwrap();

        cipher.key_manager().lock().await;

        assert_eq!(cipher.encrypt(b"x").await.unwrap_err(), VaultError::Locked);
        assert_eq!(cipher.decrypt(&envelope).await.unwrap_err(), VaultError::Locked);
    }

    #[tokio::test]
    async fn test_other_session_key_cannot_decrypt() {
        let a = unlocked_cipher().await;
        let b = unlocked_cipher().await;

        let envelope = a.encrypt_str("title").await.unwrap();
        assert!(b.decrypt_string(&envelope).await.unwrap_err().is_decryption());
    }
}
