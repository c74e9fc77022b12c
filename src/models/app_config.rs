//! Provider configuration models
//!
//! API keys and model names are stored as two independent envelopes so one
//! can be rotated without re-encrypting the other.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{Envelope, SecureString};

/// Text generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Openai,
    Claude,
    Xai,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Self::Gemini, Self::Openai, Self::Claude, Self::Xai];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Openai => "openai",
            Self::Claude => "claude",
            Self::Xai => "xai",
        }
    }

    /// Parse provider from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" => Some(Self::Openai),
            "claude" | "anthropic" => Some(Self::Claude),
            "xai" | "grok" => Some(Self::Xai),
            _ => None,
        }
    }

    /// Model used when nothing else is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash-exp",
            Self::Openai => "gpt-4o-mini",
            Self::Claude => "claude-sonnet-4-5-20250929",
            Self::Xai => "grok-beta",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ApiKeys = BTreeMap<Provider, SecureString>;
pub type ModelConfigs = BTreeMap<Provider, String>;

/// Persisted form of the provider configuration (singleton record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub selected_provider: Provider,
    #[serde(rename = "encryptedAPIKeys")]
    pub encrypted_api_keys: Envelope,
    pub encrypted_model_configs: Envelope,
    pub last_modified: DateTime<Utc>,
}

/// Decrypted provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderSettings {
    pub selected_provider: Provider,
    pub api_keys: ApiKeys,
    pub model_configs: ModelConfigs,
}

impl ProviderSettings {
    /// No keys, every provider on its default model
    pub fn with_default_models(selected_provider: Provider) -> Self {
        Self {
            selected_provider,
            api_keys: ApiKeys::new(),
            model_configs: Provider::ALL
                .iter()
                .map(|p| (*p, p.default_model().to_string()))
                .collect(),
        }
    }

    /// Key for the selected provider, if any
    pub fn active_api_key(&self) -> Option<&SecureString> {
        self.api_keys
            .get(&self.selected_provider)
            .filter(|key| !key.is_empty())
    }

    /// Model for the selected provider, falling back to its default
    pub fn active_model(&self) -> &str {
        self.model_configs
            .get(&self.selected_provider)
            .map(String::as_str)
            .unwrap_or_else(|| self.selected_provider.default_model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(Provider::parse("Anthropic"), Some(Provider::Claude));
        assert_eq!(Provider::parse("openai"), Some(Provider::Openai));
        assert_eq!(Provider::parse("other"), None);
    }

    #[test]
    fn test_default_models() {
        let settings = ProviderSettings::with_default_models(Provider::Openai);
        assert_eq!(settings.model_configs.len(), 4);
        assert_eq!(settings.active_model(), "gpt-4o-mini");
        assert!(settings.active_api_key().is_none());
    }

    #[test]
    fn test_active_model_falls_back() {
        let settings = ProviderSettings {
            selected_provider: Provider::Xai,
            ..Default::default()
        };
        assert_eq!(settings.active_model(), "grok-beta");
    }

    #[test]
    fn test_provider_keyed_maps_serialize_by_name() {
        let mut keys = ApiKeys::new();
        keys.insert(Provider::Claude, SecureString::new("sk-ant"));
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"{"claude":"sk-ant"}"#);

        let back: ApiKeys = serde_json::from_str(&json).unwrap();
        assert_eq!(back, keys);
    }
}
