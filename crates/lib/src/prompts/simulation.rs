//! Prompts and schema for a simulated agent turn.

use serde_json::{json, Value};

/// Base system prompt for a simulated agent turn.
///
/// Placeholders: `{persona}`, `{language_rule}`
pub const AGENT_TURN_SYSTEM_PROMPT: &str = r#"{persona}

Answer the customer's question using only the knowledge provided with it. If the knowledge does not cover the question, say so politely and keep the confidence low.
{language_rule}

Classify the exchange as well: the customer's intent, the category it belongs to, a short reasoning for your answer, your confidence between 0 and 1, and the customer's sentiment (one of Positive, Neutral, Negative, Urgent)."#;

/// Persona used when no bot is selected.
pub const DEFAULT_PERSONA: &str = "You are an AI assistant.";

/// Placeholders: `{input}`, `{knowledge}`
pub const AGENT_TURN_USER_PROMPT: &str = "Question: {input}\nKnowledge: {knowledge}";

/// The object schema requested for an agent turn.
pub fn turn_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reply": { "type": "string" },
            "intent": { "type": "string" },
            "category": { "type": "string" },
            "reasoning": { "type": "string" },
            "confidence": { "type": "number" },
            "sentiment": { "type": "string" }
        },
        "required": ["reply", "intent", "category", "reasoning", "confidence", "sentiment"]
    })
}
