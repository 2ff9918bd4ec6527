//! # Application Configuration
//!
//! Defines the configuration shared by the server and the CLI and the logic
//! for loading it. Values are layered, later layers winning:
//!
//! 1. Programmatic defaults (a `gemini_default` provider, batch settings).
//! 2. An optional YAML file (`config.yml` or an explicit path) in which
//!    `${VAR}` placeholders are replaced from the environment.
//! 3. The plain `PORT` and `STORE_PATH` environment variables.
//! 4. `ANYBOT_` prefixed variables for nested keys, e.g.
//!    `ANYBOT_INGESTION__BATCH_SIZE=10`.

use crate::types::Language;
use config::{
    Config as ConfigBuilder, Environment, File, FileFormat, Value as ConfigValue,
    ValueKind as ConfigValueKind,
};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";
pub const DEFAULT_PROVIDER_NAME: &str = "gemini_default";
pub const DEFAULT_MODEL: &str = "gemini-3-flash";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the admin API. Loaded from the `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The JSON file holding the persisted console state. Loaded from `STORE_PATH`.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// The language used for labels and AI output until changed in settings.
    #[serde(default)]
    pub language: Language,
    /// The key of the provider used when a request does not name one.
    #[serde(default = "default_provider_name")]
    pub default_provider: String,
    /// A map of named, reusable AI provider configurations.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

fn default_port() -> u16 {
    9090
}

fn default_store_path() -> String {
    "db/anybot.json".to_string()
}

fn default_provider_name() -> String {
    DEFAULT_PROVIDER_NAME.to_string()
}

/// A reusable configuration for a specific AI provider instance.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider ("gemini" or "local").
    pub provider: String,
    /// The API URL. Optional for Gemini, where it is derived from the model name.
    #[serde(default)]
    pub api_url: Option<String>,
    /// The API key, which can be null for local providers.
    #[serde(default)]
    pub api_key: Option<String>,
    pub model_name: String,
}

/// Knobs for the batch classification loop.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between batches, in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay_ms() -> u64 {
    400
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Returns the provider configuration the console uses by default.
    pub fn default_provider_config(&self) -> Result<&ProviderConfig, ConfigError> {
        self.providers.get(&self.default_provider).ok_or_else(|| {
            ConfigError::NotFound(format!(
                "Default provider '{}' is not defined under `providers`.",
                self.default_provider
            ))
        })
    }
}

/// Constructs the default provider map: one Gemini provider keyed by
/// `gemini_default`, picking its key up from `AI_API_KEY` when present.
fn build_default_providers() -> HashMap<String, ConfigValue> {
    let mut table = HashMap::new();
    table.insert("provider".to_string(), ConfigValue::from("gemini"));
    table.insert("model_name".to_string(), ConfigValue::from(DEFAULT_MODEL));
    if let Ok(key) = env::var("AI_API_KEY") {
        if !key.is_empty() {
            table.insert("api_key".to_string(), ConfigValue::from(key));
        }
    }

    let mut providers = HashMap::new();
    providers.insert(
        DEFAULT_PROVIDER_NAME.to_string(),
        ConfigValue::new(None, ConfigValueKind::Table(table)),
    );
    providers
}

// Reads a file and substitutes `${VAR}` placeholders from the environment.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(format!("Invalid substitution pattern: {e}")))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// An explicit `config_path_override` must exist; the implicit `config.yml`
/// is optional and the programmatic defaults are used without it.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        // Layer 1: Programmatic defaults.
        .set_default("providers", build_default_providers())?;

    // Layer 2: YAML file.
    let config_path = config_path_override.unwrap_or(DEFAULT_CONFIG_PATH);
    match read_and_substitute(config_path)? {
        Some(content) => {
            info!("Loading configuration from '{config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if config_path_override.is_some() => {
            return Err(ConfigError::NotFound(format!(
                "Config file not found at '{config_path}'."
            )));
        }
        None => info!("'{config_path}' not found. Using built-in defaults."),
    }

    // Layer 3: `PORT` and `STORE_PATH` only. A blanket source would also
    // read unrelated variables like `LANGUAGE`.
    let settings = builder
        .set_override_option("port", env::var("PORT").ok())?
        .set_override_option("store_path", env::var("STORE_PATH").ok())?
        // Layer 4: Prefixed variables for nested overrides.
        .add_source(
            Environment::with_prefix("ANYBOT")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    Ok(config)
}
