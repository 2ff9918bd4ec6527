//! # Batch Classifier
//!
//! Sends bounded batches of raw records to the AI provider and validates what
//! comes back. The provider is asked for a JSON array, but nothing it returns
//! is trusted: every element is read field by field with an explicit fallback,
//! and the result is padded or truncated to the batch length.

use crate::{
    errors::PromptError,
    ingest::{IngestError, RawRecord},
    prompts::{classification as templates, fill, with_language},
    providers::ai::{AiProvider, GenerationOptions},
    types::{Language, TaxonomyCategory},
};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const FALLBACK_INTENT: &str = "General";

/// The classifier's verdict for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Option<String>,
    pub intent: String,
    pub keywords: Vec<String>,
    pub confidence: Option<f64>,
}

impl Classification {
    /// The entry used when the provider returned nothing usable for a record.
    pub fn fallback() -> Self {
        Self {
            category: None,
            intent: FALLBACK_INTENT.to_string(),
            keywords: Vec::new(),
            confidence: None,
        }
    }

    fn from_value(value: &Value) -> Self {
        Self {
            category: non_blank_str(value.get("category")),
            intent: non_blank_str(value.get("intent"))
                .unwrap_or_else(|| FALLBACK_INTENT.to_string()),
            keywords: string_list(value.get("keywords")),
            confidence: value.get("confidence").and_then(Value::as_f64),
        }
    }
}

/// Single-record analysis used when adding scripts to a category by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentAnalysis {
    pub intent: String,
    pub keywords: Vec<String>,
    pub confidence: Option<f64>,
}

fn non_blank_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| non_blank_str(Some(item)))
                .collect()
        })
        .unwrap_or_default()
}

/// Parses a provider body as JSON, tolerating markdown code fences.
///
/// Empty text and malformed JSON both yield `None`; the caller decides the
/// empty value.
pub(crate) fn parse_json_body(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let body = Regex::new(r"```(?:json)?\s*([\s\S]*?)```")
        .ok()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(trimmed);

    match serde_json::from_str::<Value>(body) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Malformed JSON from AI provider, using empty value: {e}");
            None
        }
    }
}

/// Validates a batch response into exactly `expected` classifications.
pub fn parse_batch_response(text: &str, expected: usize) -> Vec<Classification> {
    let elements: Vec<Value> = match parse_json_body(text) {
        Some(Value::Array(items)) => items,
        Some(obj @ Value::Object(_)) => vec![obj],
        Some(other) => {
            warn!("Classifier returned a non-array JSON value: {other}");
            Vec::new()
        }
        None => Vec::new(),
    };

    if elements.len() != expected {
        warn!(
            "Classifier returned {} result(s) for a batch of {expected}; fitting to batch length.",
            elements.len()
        );
    }

    let mut results: Vec<Classification> = elements
        .iter()
        .take(expected)
        .map(Classification::from_value)
        .collect();
    results.resize_with(expected, Classification::fallback);
    results
}

/// Validates a single-content analysis response.
pub fn parse_analysis_response(text: &str) -> ContentAnalysis {
    let value = parse_json_body(text).unwrap_or(Value::Null);
    ContentAnalysis {
        intent: non_blank_str(value.get("intent")).unwrap_or_else(|| FALLBACK_INTENT.to_string()),
        keywords: string_list(value.get("keywords")),
        confidence: value.get("confidence").and_then(Value::as_f64),
    }
}

fn format_blocks(records: &[RawRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let mut block = format!("[{}] Title: {}\n", idx + 1, record.title);
            if let Some(category) = &record.provided_category {
                block.push_str(&format!("Suggested category: {category}\n"));
            }
            block.push_str(&format!("Content: {}", record.content));
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A client for classifying records through an `AiProvider`.
#[derive(Debug, Clone)]
pub struct BatchClassifier {
    provider: Box<dyn AiProvider>,
    language: Language,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

impl BatchClassifier {
    pub fn new(provider: Box<dyn AiProvider>, language: Language) -> Self {
        Self {
            provider,
            language,
            temperature: None,
            top_p: None,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = Some(temperature);
        self.top_p = Some(top_p);
        self
    }

    fn options(&self, schema: Value) -> GenerationOptions {
        GenerationOptions::json(schema).with_sampling(self.temperature, self.top_p)
    }

    /// Classifies one batch with a single provider request.
    ///
    /// A provider failure is returned as `ClassifierRequestFailed`; there is
    /// no retry. A malformed body is not an error.
    #[instrument(skip_all, fields(batch_len = records.len()))]
    pub async fn classify_batch(
        &self,
        records: &[RawRecord],
        existing_taxonomy: &[TaxonomyCategory],
        parent_hint: Option<&str>,
    ) -> Result<Vec<Classification>, IngestError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let categories = if existing_taxonomy.is_empty() {
            "(none yet)".to_string()
        } else {
            existing_taxonomy
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let count = records.len().to_string();

        let system_prompt = fill(
            &with_language(templates::BATCH_CLASSIFICATION_SYSTEM_PROMPT, self.language),
            &[
                ("count", count.as_str()),
                ("categories", categories.as_str()),
                ("parent_hint", parent_hint.unwrap_or(FALLBACK_INTENT)),
            ],
        );
        let user_prompt = fill(
            templates::BATCH_CLASSIFICATION_USER_PROMPT,
            &[("count", count.as_str()), ("blocks", format_blocks(records).as_str())],
        );

        debug!(system_prompt = %system_prompt, user_prompt = %user_prompt, "--> Sending batch to AI Provider");
        let generation = self
            .provider
            .generate(
                &system_prompt,
                &user_prompt,
                &self.options(templates::batch_schema()),
            )
            .await?;
        debug!("<-- Batch classification: {}", generation.text);

        let results = parse_batch_response(&generation.text, records.len());
        info!("Classified a batch of {} record(s).", results.len());
        Ok(results)
    }

    /// Analyzes one piece of content against a list of candidate categories.
    pub async fn analyze_content(
        &self,
        content: &str,
        candidate_categories: &[String],
    ) -> Result<ContentAnalysis, PromptError> {
        let system_prompt = with_language(templates::CONTENT_ANALYSIS_SYSTEM_PROMPT, self.language);
        let user_prompt = fill(
            templates::CONTENT_ANALYSIS_USER_PROMPT,
            &[("content", content), ("categories", candidate_categories.join(", ").as_str())],
        );

        let generation = self
            .provider
            .generate(
                &system_prompt,
                &user_prompt,
                &self.options(templates::analysis_schema()),
            )
            .await?;
        Ok(parse_analysis_response(&generation.text))
    }
}
