//! Cryptographic functions for SSA Vault
//!
//! AES-256-GCM envelopes under a session key derived with
//! PBKDF2-HMAC-SHA256. The key lives in [`KeyManager`]; everything else
//! encrypts through [`EnvelopeCipher`].

pub mod cipher;
pub mod encryption;
pub mod key_derivation;
pub mod key_manager;
pub mod secure_memory;

pub use cipher::EnvelopeCipher;
pub use encryption::{CipherAlgorithm, Envelope};
pub use key_derivation::{derive_key, KeyDerivationParams, SessionKey, MIN_ITERATIONS};
pub use key_manager::{KeyManager, KeyringRecord, SessionState};
pub use secure_memory::SecureString;
