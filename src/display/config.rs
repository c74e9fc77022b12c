//! Provider configuration display
//!
//! API keys are never printed in full.

use crate::models::{Provider, ProviderSettings};

/// Format the provider configuration with masked keys
pub fn format_provider_settings(settings: &ProviderSettings) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Selected provider: {}\n\n",
        settings.selected_provider
    ));

    output.push_str(&format!(
        "  {:<8}  {:<30}  {}\n",
        "Provider", "Model", "API Key"
    ));
    output.push_str(&format!("  {:-<8}  {:-<30}  {:-<12}\n", "", "", ""));

    for provider in Provider::ALL {
        let marker = if provider == settings.selected_provider {
            "*"
        } else {
            " "
        };
        let model = settings
            .model_configs
            .get(&provider)
            .map(String::as_str)
            .unwrap_or_else(|| provider.default_model());
        let key = settings
            .api_keys
            .get(&provider)
            .map(|k| mask_key(k.as_str()))
            .unwrap_or_else(|| "(not set)".to_string());

        output.push_str(&format!(
            "{} {:<8}  {:<30}  {}\n",
            marker,
            provider.as_str(),
            model,
            key
        ));
    }

    output
}

/// Keep the last four characters of a key visible
pub fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len == 0 {
        return "(not set)".to_string();
    }
    if len <= 8 {
        return "*".repeat(len);
    }
    let tail: String = key.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(8), tail)
}
