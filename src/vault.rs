//! Vault facade
//!
//! Wires one [`KeyManager`], one [`EnvelopeCipher`] and both repositories
//! over a single shared store. Nothing here is global; callers own the
//! [`Vault`] and pass it where it is needed.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::config::Settings;
use crate::crypto::{EnvelopeCipher, KeyManager, SecureString, SessionState};
use crate::error::VaultResult;
use crate::repository::{ConfigRepository, ReportRepository};
use crate::storage::PersistentStore;

pub struct Vault {
    keys: Arc<KeyManager>,
    reports: ReportRepository,
    config: ConfigRepository,
}

impl Vault {
    /// Open a vault over `store` and detect whether a passphrase exists
    pub async fn open(store: Arc<dyn PersistentStore>, settings: &Settings) -> VaultResult<Self> {
        settings.validate()?;
        let keys = Arc::new(KeyManager::with_iterations(
            store.clone(),
            settings.kdf_iterations,
        ));
        Self::with_key_manager(store, keys).await
    }

    /// Open a vault around an existing key manager
    pub async fn with_key_manager(
        store: Arc<dyn PersistentStore>,
        keys: Arc<KeyManager>,
    ) -> VaultResult<Self> {
        let state = keys.initialize().await?;
        debug!(%state, "vault opened");

        let cipher = EnvelopeCipher::new(keys.clone());
        Ok(Self {
            reports: ReportRepository::new(store.clone(), cipher.clone()),
            config: ConfigRepository::new(store, cipher),
            keys,
        })
    }

    pub fn state(&self) -> SessionState {
        self.keys.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.keys.subscribe()
    }

    pub async fn setup_passphrase(&self, passphrase: SecureString) -> VaultResult<()> {
        self.keys.setup_passphrase(passphrase).await
    }

    pub async fn unlock(&self, passphrase: SecureString) -> VaultResult<()> {
        self.keys.unlock(passphrase).await
    }

    pub async fn lock(&self) {
        self.keys.lock().await
    }

    pub fn key_manager(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    pub fn reports(&self) -> &ReportRepository {
        &self.reports
    }

    pub fn config(&self) -> &ConfigRepository {
        &self.config
    }
}
