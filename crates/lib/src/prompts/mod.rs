//! # Prompt Template Modules
//!
//! All prompt templates and response schemas sent to the AI provider, grouped
//! by the call site that uses them. Templates use `{placeholder}` markers that
//! callers fill with [`fill`].

pub mod authoring;
pub mod classification;
pub mod simulation;

use crate::types::Language;
use regex::{Captures, Regex};

/// Fills the `{language}` marker shared by every template.
pub fn with_language(template: &str, language: Language) -> String {
    template.replace("{language}", language.prompt_name())
}

/// Fills `{placeholder}` markers in one pass.
///
/// Inserted values are never scanned again, so user content that happens to
/// contain a marker such as `{knowledge}` is kept verbatim. Markers without a
/// value are left as they are.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let Ok(re) = Regex::new(r"\{([a-z_]+)\}") else {
        return template.to_string();
    };
    re.replace_all(template, |caps: &Captures| {
        values
            .iter()
            .find(|(key, _)| *key == &caps[1])
            .map(|(_, value)| (*value).to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
