//! # Application State
//!
//! The shared state handed to every request handler: the configuration, the
//! console store and the AI provider clients built from `providers`.

use crate::errors::AppError;
use anybot::{
    config::AppConfig,
    providers::{
        ai::AiProvider,
        factory::{create_provider, create_provider_for_model},
    },
    store::JsonFileBackend,
    PromptError, Store,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    /// The console state, persisted to `store_path`.
    pub store: Store,
    /// A map of instantiated AI providers, keyed by their name from the config.
    pub ai_providers: Arc<HashMap<String, Box<dyn AiProvider>>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Store,
        ai_providers: HashMap<String, Box<dyn AiProvider>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            ai_providers: Arc::new(ai_providers),
        }
    }

    fn default_provider(&self) -> Result<Box<dyn AiProvider>, AppError> {
        self.ai_providers
            .get(&self.config.default_provider)
            .cloned()
            .ok_or_else(|| {
                AppError::Prompt(PromptError::MissingAiProvider(format!(
                    "Provider '{}' is not available.",
                    self.config.default_provider
                )))
            })
    }

    /// The provider serving the model selected in settings.
    ///
    /// The configured default serves its own model. Any other model gets a
    /// client built on demand; if that fails the default is used instead.
    pub async fn active_provider(&self) -> Result<Box<dyn AiProvider>, AppError> {
        let active_model = self
            .store
            .read(|s| s.settings.active_model.clone())
            .await;
        let serves_active = self
            .config
            .default_provider_config()
            .map(|c| c.model_name == active_model)
            .unwrap_or(false);
        if serves_active {
            return self.default_provider();
        }

        match create_provider_for_model(&self.config.providers, &active_model) {
            Ok(provider) => Ok(provider),
            Err(e) => {
                warn!("Cannot serve model '{active_model}' ({e}); using the default provider.");
                self.default_provider()
            }
        }
    }
}

/// Builds the shared application state from the configuration.
///
/// Providers that cannot be built (a Gemini entry without a key, say) are
/// skipped with a warning so the console still starts; requests that need
/// them fail later with a configuration error.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let mut ai_providers = HashMap::new();
    for (name, provider_config) in &config.providers {
        match create_provider(provider_config) {
            Ok(provider) => {
                ai_providers.insert(name.clone(), provider);
            }
            Err(e) => warn!("Skipping AI provider '{name}': {e}"),
        }
    }

    let store = Store::open(JsonFileBackend::new(&config.store_path)).await?;
    info!(
        providers = ai_providers.len(),
        store_path = %config.store_path,
        "Application state built."
    );
    Ok(AppState::new(config, store, ai_providers))
}
