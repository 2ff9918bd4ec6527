pub mod gemini;
pub mod local;

use crate::{errors::PromptError, types::TokenUsage};
use async_trait::async_trait;
use dyn_clone::DynClone;
use serde_json::Value;
use std::fmt::Debug;

/// Per-call generation knobs.
///
/// When `response_schema` is set the provider is asked for a JSON body that
/// matches it; the caller still validates what comes back.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub response_schema: Option<Value>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

impl GenerationOptions {
    pub fn json(schema: Value) -> Self {
        Self {
            response_schema: Some(schema),
            ..Default::default()
        }
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, top_p: Option<f32>) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }
}

/// The text of a completion plus whatever usage the provider reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// A trait for interacting with a hosted generative-language API.
///
/// Classification, chat simulation and authoring helpers all go through this
/// single request/response call, so tests can swap in a scripted provider.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);
