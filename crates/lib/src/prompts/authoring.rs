//! Prompts for the operator-facing authoring helpers.

/// Placeholder: `{language}`
pub const BOT_PROMPT_SYSTEM_PROMPT: &str = "You are an AI Engineer. Write a professional System Prompt for this bot based on provided info. The output must be strictly in {language}.";

/// Placeholders: `{name}`, `{role}`, `{tone}`
pub const BOT_PROMPT_USER_PROMPT: &str = "Bot Name: {name}\nRole: {role}\nTone: {tone}";

/// Placeholder: `{language}`
pub const CATEGORY_CONTEXT_SYSTEM_PROMPT: &str = r#"You are an AI Training Expert. Analyze the provided knowledge snippets and produce a professional "Intelligence Definition" in {language}."#;

/// Placeholders: `{name}`, `{samples}`
pub const CATEGORY_CONTEXT_USER_PROMPT: &str = "CATEGORY: {name}\nDATA:\n{samples}";

/// Placeholder: `{language}`
pub const TEST_QUESTION_SYSTEM_PROMPT: &str =
    "Return the question as a single line. Language: {language}.";

/// Placeholder: `{content}`
pub const TEST_QUESTION_USER_PROMPT: &str = "Generate a user question for: {content}";

pub const CONNECTION_CHECK_SYSTEM_PROMPT: &str = "Reply with the single word OK.";
pub const CONNECTION_CHECK_USER_PROMPT: &str = "Connection check.";
