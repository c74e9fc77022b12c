//! Session key lifecycle
//!
//! ```text
//! Uninitialized --initialize--> AwaitingSetup --setup_passphrase--> Unlocked
//!               \--initialize--> Locked <--lock-- Unlocked
//!                                Locked --unlock--> Unlocked
//! ```
//!
//! The key only ever exists inside [`KeyManager`]. Other components borrow
//! it for the duration of a single seal/open through [`KeyManager::with_key`].
//! There is no recovery path: without the passphrase the key cannot be
//! rebuilt.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{VaultError, VaultResult};
use crate::storage::{PersistentStore, RecordKind, StoredRecord};

use super::encryption::{open, seal, Envelope};
use super::key_derivation::{derive_key, KeyDerivationParams, SessionKey, MIN_ITERATIONS};
use super::secure_memory::SecureString;

/// Record id of the keyring entry
pub const KEYRING_RECORD_ID: &str = "session";

/// Known plaintext sealed at setup and opened on every unlock
const VERIFICATION_PLAINTEXT: &[u8] = b"ssa-vault passphrase check v1";

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    AwaitingSetup,
    Locked,
    Unlocked,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingSetup => "awaiting setup",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        };
        f.write_str(s)
    }
}

/// Persisted salt, cost and verification envelope
///
/// Nothing in here is secret on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringRecord {
    #[serde(flatten)]
    pub params: KeyDerivationParams,
    pub verification: Envelope,
    pub created_at: DateTime<Utc>,
}

enum Session {
    Uninitialized,
    AwaitingSetup,
    Locked,
    Unlocked(SessionKey),
}

impl Session {
    fn state(&self) -> SessionState {
        match self {
            Self::Uninitialized => SessionState::Uninitialized,
            Self::AwaitingSetup => SessionState::AwaitingSetup,
            Self::Locked => SessionState::Locked,
            Self::Unlocked(_) => SessionState::Unlocked,
        }
    }
}

/// Owner of the single in-memory session key
pub struct KeyManager {
    store: Arc<dyn PersistentStore>,
    session: RwLock<Session>,
    /// Serializes setup, unlock and lock so concurrent attempts queue up
    transitions: Mutex<()>,
    state_tx: watch::Sender<SessionState>,
    iterations: u32,
}

impl KeyManager {
    /// Create a key manager using the default PBKDF2 cost for new setups
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self::with_iterations(store, MIN_ITERATIONS)
    }

    /// Create a key manager with a specific PBKDF2 cost for new setups
    ///
    /// Unlock always uses the cost recorded at setup time.
    pub fn with_iterations(store: Arc<dyn PersistentStore>, iterations: u32) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Uninitialized);
        Self {
            store,
            session: RwLock::new(Session::Uninitialized),
            transitions: Mutex::new(()),
            state_tx,
            iterations,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == SessionState::Unlocked
    }

    /// Detect whether a passphrase has been set up
    ///
    /// Only the first call reads the store; later calls report the current
    /// state unchanged.
    pub async fn initialize(&self) -> VaultResult<SessionState> {
        let _guard = self.transitions.lock().await;
        let mut session = self.session.write().await;
        if !matches!(*session, Session::Uninitialized) {
            return Ok(session.state());
        }

        let exists = self
            .store
            .get(RecordKind::Keyring, KEYRING_RECORD_ID)
            .await?
            .is_some();

        *session = if exists {
            Session::Locked
        } else {
            Session::AwaitingSetup
        };
        let state = session.state();
        drop(session);

        info!(state = %state, "key manager initialized");
        self.publish(state);
        Ok(state)
    }

    /// Set the passphrase for the first time and unlock
    pub async fn setup_passphrase(&self, passphrase: SecureString) -> VaultResult<()> {
        if passphrase.is_empty() {
            return Err(VaultError::Validation("Passphrase cannot be empty".into()));
        }

        let _guard = self.transitions.lock().await;
        match self.session.read().await.state() {
            SessionState::AwaitingSetup => {}
            SessionState::Uninitialized => {
                return Err(VaultError::InvalidState(
                    "initialize must run before setup".into(),
                ))
            }
            SessionState::Locked | SessionState::Unlocked => {
                return Err(VaultError::Setup("a passphrase is already set up".into()))
            }
        }

        // Another process may have completed setup since initialize
        if self
            .store
            .get(RecordKind::Keyring, KEYRING_RECORD_ID)
            .await?
            .is_some()
        {
            return Err(VaultError::Setup("a passphrase is already set up".into()));
        }

        let params = KeyDerivationParams::with_iterations(self.iterations);
        let key = derive_off_thread(passphrase, params.clone()).await?;

        let record = KeyringRecord {
            params,
            verification: seal(VERIFICATION_PLAINTEXT, &key)?,
            created_at: Utc::now(),
        };
        self.store
            .put(
                RecordKind::Keyring,
                StoredRecord::from_entity(KEYRING_RECORD_ID, &record)?,
            )
            .await?;

        *self.session.write().await = Session::Unlocked(key);
        info!("passphrase set up, session unlocked");
        self.publish(SessionState::Unlocked);
        Ok(())
    }

    /// Re-derive the key from the stored salt and verify it
    ///
    /// A wrong passphrase leaves the manager locked. No attempt counter or
    /// delay is applied here.
    pub async fn unlock(&self, passphrase: SecureString) -> VaultResult<()> {
        let _guard = self.transitions.lock().await;
        match self.session.read().await.state() {
            SessionState::Locked => {}
            SessionState::Unlocked => {
                return Err(VaultError::InvalidState("session is already unlocked".into()))
            }
            SessionState::AwaitingSetup => {
                return Err(VaultError::InvalidState("no passphrase has been set up".into()))
            }
            SessionState::Uninitialized => {
                return Err(VaultError::InvalidState(
                    "initialize must run before unlock".into(),
                ))
            }
        }

        let record: KeyringRecord = self
            .store
            .get(RecordKind::Keyring, KEYRING_RECORD_ID)
            .await?
            .ok_or_else(|| VaultError::Storage("keyring record disappeared".into()))?
            .to_entity()?;

        let key = derive_off_thread(passphrase, record.params.clone()).await?;

        match open(&record.verification, &key) {
            Ok(plaintext) if plaintext == VERIFICATION_PLAINTEXT => {}
            Ok(_) | Err(VaultError::Decryption(_)) => {
                warn!("unlock rejected: passphrase did not verify");
                return Err(VaultError::InvalidPassphrase);
            }
            Err(e) => return Err(e),
        }

        *self.session.write().await = Session::Unlocked(key);
        info!("session unlocked");
        self.publish(SessionState::Unlocked);
        Ok(())
    }

    /// Drop the session key. Calling it while not unlocked does nothing.
    pub async fn lock(&self) {
        let _guard = self.transitions.lock().await;
        let mut session = self.session.write().await;
        if matches!(*session, Session::Unlocked(_)) {
            // Dropping the old value zeroizes the key
            *session = Session::Locked;
            drop(session);
            info!("session locked");
            self.publish(SessionState::Locked);
        } else {
            debug!("lock requested while not unlocked");
        }
    }

    /// Run `f` with the session key, or fail with [`VaultError::Locked`]
    pub(crate) async fn with_key<R, F>(&self, f: F) -> VaultResult<R>
    where
        F: FnOnce(&SessionKey) -> VaultResult<R>,
    {
        match &*self.session.read().await {
            Session::Unlocked(key) => f(key),
            _ => Err(VaultError::Locked),
        }
    }

    fn publish(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("state", &self.state())
            .field("iterations", &self.iterations)
            .finish()
    }
}

async fn derive_off_thread(
    passphrase: SecureString,
    params: KeyDerivationParams,
) -> VaultResult<SessionKey> {
    tokio::task::spawn_blocking(move || derive_key(&passphrase, &params))
        .await
        .map_err(|e| VaultError::Encryption(format!("Key derivation task failed: {}", e)))?
}
