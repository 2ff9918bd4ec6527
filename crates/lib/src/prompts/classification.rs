//! Prompts and schemas for batch classification during ingestion.

use serde_json::{json, Value};

/// System prompt for classifying a batch of knowledge records.
///
/// Placeholders: `{language}`, `{count}`, `{categories}`, `{parent_hint}`
pub const BATCH_CLASSIFICATION_SYSTEM_PROMPT: &str = r#"You are a knowledge-base curator for a customer support bot. Analyze the category, intent and keywords of each of the {count} data blocks you receive.

# Rules
1. Return a JSON ARRAY with exactly {count} elements, one per block, in the same order as the blocks.
2. Prefer one of the existing categories when it fits: {categories}
3. The blocks belong under the group "{parent_hint}". Choose categories that are specific children of that group.
4. If a block carries a suggested category, use it unless it is clearly wrong.
5. `intent` is a short label for what a customer wants when this block answers them.
6. `confidence` is a number between 0 and 1.
7. Category names, intents and keywords must be written in {language}."#;

/// User prompt listing the records of one batch.
///
/// Placeholders: `{count}`, `{blocks}`
pub const BATCH_CLASSIFICATION_USER_PROMPT: &str = "Analyze these {count} data blocks.\n\n{blocks}";

/// System prompt for analyzing one piece of content in isolation.
///
/// Placeholder: `{language}`
pub const CONTENT_ANALYSIS_SYSTEM_PROMPT: &str = "Analyze the text and return its intent and keywords in JSON format. Write them in {language}.";

/// Placeholders: `{content}`, `{categories}`
pub const CONTENT_ANALYSIS_USER_PROMPT: &str = "Content: {content}\nPossible Categories: {categories}";

/// The array schema requested for a classification batch.
pub fn batch_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "category": { "type": "string" },
                "intent": { "type": "string" },
                "keywords": { "type": "array", "items": { "type": "string" } },
                "confidence": { "type": "number" }
            },
            "required": ["category", "intent", "keywords", "confidence"]
        }
    })
}

/// The object schema requested for a single content analysis.
pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "intent": { "type": "string" },
            "keywords": { "type": "array", "items": { "type": "string" } },
            "confidence": { "type": "number" }
        },
        "required": ["intent", "keywords"]
    })
}
