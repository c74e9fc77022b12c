//! User settings for SSA Vault
//!
//! Settings hold only non-secret preferences: key-derivation cost, log
//! filter and the provider preselected on first run. Nothing in here is
//! encrypted, so nothing in here may be sensitive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::crypto::key_derivation::MIN_ITERATIONS;
use crate::error::VaultError;
use crate::models::Provider;

/// User settings for SSA Vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// PBKDF2 iteration count used when a passphrase is first set up
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// `tracing` filter directive used when `SSA_VAULT_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Provider selected when the provider config is created
    #[serde(default)]
    pub default_provider: Provider,
}

fn default_schema_version() -> u32 {
    1
}

fn default_kdf_iterations() -> u32 {
    MIN_ITERATIONS
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            kdf_iterations: default_kdf_iterations(),
            log_filter: default_log_filter(),
            default_provider: Provider::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or default settings if the file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| VaultError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        self.validate()?;
        std::fs::create_dir_all(paths.base_dir())
            .map_err(|e| VaultError::Io(format!("Failed to create base directory: {}", e)))?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| VaultError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject settings that would weaken the key derivation
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.kdf_iterations < MIN_ITERATIONS {
            return Err(VaultError::Config(format!(
                "kdf_iterations must be at least {}, got {}",
                MIN_ITERATIONS, self.kdf_iterations
            )));
        }
        Ok(())
    }
}

/// Provider credentials and model names supplied by the environment
///
/// Read from `SSA_VAULT_<PROVIDER>_API_KEY` and `SSA_VAULT_<PROVIDER>_MODEL`.
/// These values only seed the provider config; they reach disk through the
/// normal encrypt-and-save path like anything the user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderDefaults {
    pub api_keys: BTreeMap<Provider, String>,
    pub models: BTreeMap<Provider, String>,
}

impl ProviderDefaults {
    /// Collect defaults from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Collect defaults through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut defaults = Self::default();
        for provider in Provider::ALL {
            let prefix = format!("SSA_VAULT_{}", provider.as_str().to_uppercase());
            if let Some(key) = lookup(&format!("{}_API_KEY", prefix)).filter(|v| !v.is_empty()) {
                defaults.api_keys.insert(provider, key);
            }
            if let Some(model) = lookup(&format!("{}_MODEL", prefix)).filter(|v| !v.is_empty()) {
                defaults.models.insert(provider, model);
            }
        }
        defaults
    }

    pub fn is_empty(&self) -> bool {
        self.api_keys.is_empty() && self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.kdf_iterations, 600_000);
        assert_eq!(settings.default_provider, Provider::Gemini);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.kdf_iterations = 900_000;
        settings.default_provider = Provider::Claude;
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_weak_iterations_rejected() {
        let mut settings = Settings::default();
        settings.kdf_iterations = 1_000;
        assert!(matches!(settings.validate(), Err(VaultError::Config(_))));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_provider_defaults_from_lookup() {
        let defaults = ProviderDefaults::from_lookup(|name| match name {
            "SSA_VAULT_OPENAI_API_KEY" => Some("sk-test".to_string()),
            "SSA_VAULT_CLAUDE_MODEL" => Some("claude-test".to_string()),
            "SSA_VAULT_XAI_API_KEY" => Some(String::new()),
            _ => None,
        });

        assert_eq!(defaults.api_keys.get(&Provider::Openai).unwrap(), "sk-test");
        assert_eq!(defaults.models.get(&Provider::Claude).unwrap(), "claude-test");
        assert!(!defaults.api_keys.contains_key(&Provider::Xai));
        assert!(!defaults.is_empty());
    }
}
