//! Provider configuration repository
//!
//! The configuration is a single record. API keys and model names live in
//! separate envelopes so rotating one leaves the other byte-identical.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ProviderDefaults;
use crate::crypto::{EnvelopeCipher, SecureString};
use crate::error::{VaultError, VaultResult};
use crate::models::{ApiKeys, AppConfig, ModelConfigs, Provider, ProviderSettings};
use crate::storage::{PersistentStore, RecordKind, StoredRecord};

/// Record id of the singleton configuration
pub const CONFIG_RECORD_ID: &str = "provider";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    Saved,
    ApiKeysRotated,
    ModelsRotated,
    ProviderSelected(Provider),
}

const EVENT_CAPACITY: usize = 16;

pub struct ConfigRepository {
    store: Arc<dyn PersistentStore>,
    cipher: EnvelopeCipher,
    events: broadcast::Sender<ConfigEvent>,
}

impl ConfigRepository {
    pub fn new(store: Arc<dyn PersistentStore>, cipher: EnvelopeCipher) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            cipher,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events.subscribe()
    }

    /// Decrypt the configuration, `Ok(None)` if none was saved yet
    pub async fn get(&self) -> VaultResult<Option<ProviderSettings>> {
        let Some(record) = self.load().await? else {
            return Ok(None);
        };

        let api_keys: ApiKeys = self.cipher.decrypt_json(&record.encrypted_api_keys).await?;
        let model_configs: ModelConfigs = self
            .cipher
            .decrypt_json(&record.encrypted_model_configs)
            .await?;

        Ok(Some(ProviderSettings {
            selected_provider: record.selected_provider,
            api_keys,
            model_configs,
        }))
    }

    /// Encrypt both envelopes and replace the stored configuration
    pub async fn save(&self, settings: &ProviderSettings) -> VaultResult<()> {
        let previous = self.load().await?;
        let now = Utc::now();

        let record = AppConfig {
            selected_provider: settings.selected_provider,
            encrypted_api_keys: self.cipher.encrypt_json(&settings.api_keys).await?,
            encrypted_model_configs: self.cipher.encrypt_json(&settings.model_configs).await?,
            last_modified: previous.map_or(now, |p| now.max(p.last_modified)),
        };
        self.persist(&record).await?;

        info!(provider = %settings.selected_provider, "provider config saved");
        self.notify(ConfigEvent::Saved);
        Ok(())
    }

    /// Replace the API keys; the model envelope is untouched
    pub async fn rotate_api_keys(&self, api_keys: &ApiKeys) -> VaultResult<()> {
        let mut record = self.require().await?;
        record.encrypted_api_keys = self.cipher.encrypt_json(api_keys).await?;
        record.last_modified = Utc::now().max(record.last_modified);
        self.persist(&record).await?;

        debug!(count = api_keys.len(), "api keys rotated");
        self.notify(ConfigEvent::ApiKeysRotated);
        Ok(())
    }

    /// Replace the model names; the key envelope is untouched
    pub async fn set_model_configs(&self, models: &ModelConfigs) -> VaultResult<()> {
        let mut record = self.require().await?;
        record.encrypted_model_configs = self.cipher.encrypt_json(models).await?;
        record.last_modified = Utc::now().max(record.last_modified);
        self.persist(&record).await?;

        debug!(count = models.len(), "model configs rotated");
        self.notify(ConfigEvent::ModelsRotated);
        Ok(())
    }

    /// Set or clear one provider's API key
    ///
    /// Only the key envelope is opened. If it no longer decrypts, the other
    /// keys are lost and the envelope is rebuilt from this one.
    pub async fn set_api_key(&self, provider: Provider, key: Option<SecureString>) -> VaultResult<()> {
        let record = self.require().await?;
        let mut api_keys: ApiKeys = match self.cipher.decrypt_json(&record.encrypted_api_keys).await {
            Ok(keys) => keys,
            Err(e) if e.is_decryption() => {
                warn!(error = %e, "stored api keys unreadable, starting over");
                ApiKeys::new()
            }
            Err(e) => return Err(e),
        };

        match key {
            Some(key) => {
                api_keys.insert(provider, key);
            }
            None => {
                api_keys.remove(&provider);
            }
        }
        self.rotate_api_keys(&api_keys).await
    }

    /// Set one provider's model; the key envelope is never opened
    pub async fn set_model(&self, provider: Provider, model: impl Into<String>) -> VaultResult<()> {
        let record = self.require().await?;
        let mut models: ModelConfigs = self
            .cipher
            .decrypt_json(&record.encrypted_model_configs)
            .await?;
        models.insert(provider, model.into());
        self.set_model_configs(&models).await
    }

    /// Change the selected provider without touching either envelope
    pub async fn select_provider(&self, provider: Provider) -> VaultResult<()> {
        let mut record = self.require().await?;
        record.selected_provider = provider;
        record.last_modified = Utc::now().max(record.last_modified);
        self.persist(&record).await?;

        self.notify(ConfigEvent::ProviderSelected(provider));
        Ok(())
    }

    /// The stored configuration, or a fresh one seeded from `defaults`
    ///
    /// Environment defaults only apply when no configuration exists yet;
    /// once saved, the stored values win.
    pub async fn load_or_init(
        &self,
        selected_provider: Provider,
        defaults: &ProviderDefaults,
    ) -> VaultResult<ProviderSettings> {
        if let Some(existing) = self.get().await? {
            return Ok(existing);
        }
        self.seed(selected_provider, defaults).await
    }

    /// Seed a configuration if none exists, without decrypting a stored one
    pub async fn ensure_initialized(
        &self,
        selected_provider: Provider,
        defaults: &ProviderDefaults,
    ) -> VaultResult<()> {
        if self.load().await?.is_none() {
            self.seed(selected_provider, defaults).await?;
        }
        Ok(())
    }

    /// Raw stored record, envelopes included
    pub async fn get_record(&self) -> VaultResult<Option<AppConfig>> {
        self.load().await
    }

    async fn seed(
        &self,
        selected_provider: Provider,
        defaults: &ProviderDefaults,
    ) -> VaultResult<ProviderSettings> {
        let mut settings = ProviderSettings::with_default_models(selected_provider);
        for (provider, key) in &defaults.api_keys {
            settings
                .api_keys
                .insert(*provider, SecureString::new(key.as_str()));
        }
        for (provider, model) in &defaults.models {
            settings.model_configs.insert(*provider, model.clone());
        }

        self.save(&settings).await?;
        info!(
            seeded_keys = defaults.api_keys.len(),
            "provider config initialized"
        );
        Ok(settings)
    }

    async fn load(&self) -> VaultResult<Option<AppConfig>> {
        self.store
            .get(RecordKind::Config, CONFIG_RECORD_ID)
            .await?
            .map(|record| record.to_entity())
            .transpose()
    }

    async fn require(&self) -> VaultResult<AppConfig> {
        self.load().await?.ok_or_else(VaultError::config_not_found)
    }

    async fn persist(&self, record: &AppConfig) -> VaultResult<()> {
        let record = StoredRecord::from_entity(CONFIG_RECORD_ID, record)?;
        self.store.put(RecordKind::Config, record).await
    }

    fn notify(&self, event: ConfigEvent) {
        let _ = self.events.send(event);
    }
}
