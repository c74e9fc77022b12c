//! Provider configuration CLI commands

use clap::Subcommand;

use crate::config::{ProviderDefaults, Settings};
use crate::display::config::format_provider_settings;
use crate::error::{VaultError, VaultResult};
use crate::models::Provider;
use crate::repository::ConfigRepository;

use super::passphrase::prompt_passphrase;

/// Provider configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show provider, models and masked API keys
    Show,
    /// Select the active provider (gemini, openai, claude, xai)
    SetProvider {
        provider: String,
    },
    /// Set the API key for a provider (read from a hidden prompt)
    SetKey {
        provider: String,
        /// Remove the stored key instead
        #[arg(long)]
        clear: bool,
    },
    /// Set the model for a provider
    SetModel {
        provider: String,
        model: String,
    },
}

/// Handle a config command against an unlocked repository
///
/// Only `show` decrypts the whole configuration; the setters open at most
/// the envelope they change.
pub async fn handle_config_command(
    repo: &ConfigRepository,
    settings: &Settings,
    cmd: ConfigCommands,
) -> VaultResult<()> {
    let defaults = ProviderDefaults::from_env();

    match cmd {
        ConfigCommands::Show => {
            let current = repo.load_or_init(settings.default_provider, &defaults).await?;
            print!("{}", format_provider_settings(&current));
        }

        ConfigCommands::SetProvider { provider } => {
            let provider = parse_provider(&provider)?;
            repo.ensure_initialized(settings.default_provider, &defaults)
                .await?;
            repo.select_provider(provider).await?;
            println!("Selected provider: {}", provider);
        }

        ConfigCommands::SetKey { provider, clear } => {
            let provider = parse_provider(&provider)?;
            let key = if clear {
                None
            } else {
                let key = prompt_passphrase(&format!("API key for {}: ", provider))?;
                if key.trim().is_empty() {
                    return Err(VaultError::Validation("API key cannot be empty".into()));
                }
                Some(key)
            };

            repo.ensure_initialized(settings.default_provider, &defaults)
                .await?;
            repo.set_api_key(provider, key).await?;
            if clear {
                println!("Removed API key for {}", provider);
            } else {
                println!("Stored API key for {}", provider);
            }
        }

        ConfigCommands::SetModel { provider, model } => {
            let provider = parse_provider(&provider)?;
            let model = model.trim();
            if model.is_empty() {
                return Err(VaultError::Validation("Model name cannot be empty".into()));
            }

            repo.ensure_initialized(settings.default_provider, &defaults)
                .await?;
            repo.set_model(provider, model).await?;
            println!("Model for {} set to {}", provider, model);
        }
    }

    Ok(())
}

fn parse_provider(raw: &str) -> VaultResult<Provider> {
    Provider::parse(raw).ok_or_else(|| {
        VaultError::Validation(format!(
            "Invalid provider: '{}'. Valid providers: gemini, openai, claude, xai",
            raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EnvelopeCipher, KeyManager};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_parse_provider() {
        assert_eq!(parse_provider("grok").unwrap(), Provider::Xai);
        assert!(matches!(
            parse_provider("bard"),
            Err(VaultError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_set_model_and_provider() {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(KeyManager::with_iterations(store.clone(), 1_000));
        keys.initialize().await.unwrap();
        keys.setup_passphrase("cli tests".into()).await.unwrap();
        let repo = ConfigRepository::new(store, EnvelopeCipher::new(keys));
        let settings = Settings::default();

        handle_config_command(
            &repo,
            &settings,
            ConfigCommands::SetModel {
                provider: "claude".into(),
                model: "claude-opus".into(),
            },
        )
        .await
        .unwrap();
        handle_config_command(
            &repo,
            &settings,
            ConfigCommands::SetProvider {
                provider: "anthropic".into(),
            },
        )
        .await
        .unwrap();

        let stored = repo.get().await.unwrap().unwrap();
        assert_eq!(stored.selected_provider, Provider::Claude);
        assert_eq!(stored.active_model(), "claude-opus");
    }

    #[tokio::test]
    async fn test_set_commands_leave_other_envelopes_alone() {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(KeyManager::with_iterations(store.clone(), 1_000));
        keys.initialize().await.unwrap();
        keys.setup_passphrase("cli tests".into()).await.unwrap();
        let repo = ConfigRepository::new(store, EnvelopeCipher::new(keys));
        let settings = Settings::default();

        handle_config_command(&repo, &settings, ConfigCommands::Show)
            .await
            .unwrap();
        let before = repo.get_record().await.unwrap().unwrap();

        handle_config_command(
            &repo,
            &settings,
            ConfigCommands::SetKey {
                provider: "openai".into(),
                clear: true,
            },
        )
        .await
        .unwrap();
        handle_config_command(
            &repo,
            &settings,
            ConfigCommands::SetProvider {
                provider: "xai".into(),
            },
        )
        .await
        .unwrap();

        let after = repo.get_record().await.unwrap().unwrap();
        assert_eq!(after.encrypted_model_configs, before.encrypted_model_configs);
        assert_eq!(after.selected_provider, Provider::Xai);
        assert!(repo.get().await.unwrap().unwrap().api_keys.get(&Provider::Openai).is_none());
    }
}
