//! # AI Provider Factory
//!
//! Builds provider instances from configuration. The server and the CLI both
//! go through here, so a `config.yml` entry means the same thing everywhere.

use crate::{
    config::ProviderConfig,
    errors::PromptError,
    providers::ai::{gemini::GeminiProvider, local::LocalAiProvider, AiProvider},
};
use std::collections::HashMap;
use tracing::info;

/// Creates an AI provider from one named provider configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn AiProvider>, PromptError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config.api_key.clone().unwrap_or_default();
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| GeminiProvider::endpoint_for_model(&config.model_name));
            info!("Configuring Gemini provider with URL: {api_url}");
            Ok(Box::new(GeminiProvider::new(api_url, api_key)?))
        }
        "local" => {
            let api_url = config.api_url.clone().ok_or_else(|| {
                PromptError::MissingAiProvider(
                    "api_url is required for a 'local' provider.".to_string(),
                )
            })?;
            info!("Configuring Local AI provider with URL: {api_url}");
            Ok(Box::new(LocalAiProvider::new(
                api_url,
                config.api_key.clone(),
                Some(config.model_name.clone()),
            )?))
        }
        other => Err(PromptError::MissingAiProvider(format!(
            "Unsupported provider type: '{other}'"
        ))),
    }
}

/// Creates a provider for a model picked at runtime (the settings screen's
/// "active model"), reusing the key or URL of a configured provider of the
/// same family.
///
/// `gemini*` model names reuse the first configured Gemini provider's key;
/// anything else needs a `local` provider to borrow the endpoint from.
pub fn create_provider_for_model(
    providers: &HashMap<String, ProviderConfig>,
    model_name: &str,
) -> Result<Box<dyn AiProvider>, PromptError> {
    info!("Request to create provider for model: '{model_name}'");
    let family = if model_name.starts_with("gemini") {
        "gemini"
    } else {
        "local"
    };

    let mut candidates: Vec<(&String, &ProviderConfig)> = providers
        .iter()
        .filter(|(_, c)| c.provider == family)
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(b.0));

    let (_, base) = candidates.first().ok_or_else(|| {
        PromptError::MissingAiProvider(format!(
            "No '{family}' provider is configured to serve model '{model_name}'."
        ))
    })?;

    let config = ProviderConfig {
        provider: base.provider.clone(),
        // A Gemini URL embeds the model name, so it must be derived again.
        api_url: if family == "gemini" {
            None
        } else {
            base.api_url.clone()
        },
        api_key: base.api_key.clone(),
        model_name: model_name.to_string(),
    };
    create_provider(&config)
}
