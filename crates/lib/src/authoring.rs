//! # Authoring Helpers
//!
//! Operator-facing helpers: drafting bot prompts, summarizing categories,
//! generating test questions, checking the provider connection, turning a
//! corrected reply into golden data and adding hand-written scripts.

use crate::{
    classify::BatchClassifier,
    errors::PromptError,
    prompts::{authoring as templates, fill, with_language},
    providers::ai::{AiProvider, GenerationOptions},
    store::{Action, Store, StoreError},
    types::{
        new_id, AgentLog, Bot, Language, Script, ScriptStatus, TaxonomyCategory, Tone,
    },
};
use thiserror::Error;
use tracing::{info, instrument, warn};

const CATEGORY_SAMPLE_SIZE: usize = 10;
const SAMPLE_SEPARATOR: &str = "\n---\n";
const DEFAULT_KB_ID: &str = "kb_general";
const MIN_LINE_CHARS: usize = 5;
const MANUAL_SCRIPT_CONFIDENCE: f64 = 0.95;

#[derive(Error, Debug)]
pub enum AuthoringError {
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Prompt-backed helpers bound to one provider and output language.
#[derive(Debug, Clone)]
pub struct Authoring {
    provider: Box<dyn AiProvider>,
    language: Language,
}

impl Authoring {
    pub fn new(provider: Box<dyn AiProvider>, language: Language) -> Self {
        Self { provider, language }
    }

    /// Sends a plain-text request and returns the trimmed reply.
    async fn ask(&self, system_template: &str, user_prompt: &str) -> Result<String, PromptError> {
        let system_prompt = with_language(system_template, self.language);
        let generation = self
            .provider
            .generate(&system_prompt, user_prompt, &GenerationOptions::default())
            .await?;
        Ok(generation.text.trim().to_string())
    }

    /// Drafts a system prompt for a bot.
    pub async fn generate_bot_prompt(&self, name: &str, role: &str, tone: Tone) -> String {
        let tone = format!("{tone:?}");
        let user_prompt = fill(
            templates::BOT_PROMPT_USER_PROMPT,
            &[("name", name), ("role", role), ("tone", tone.as_str())],
        );
        match self.ask(templates::BOT_PROMPT_SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) if text.is_empty() => "You are a helpful assistant.".to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!("Bot prompt generation failed: {e}");
                "Error occurred.".to_string()
            }
        }
    }

    /// Summarizes a category from up to ten of its scripts.
    pub async fn generate_category_context(&self, name: &str, scripts: &[Script]) -> String {
        let samples = scripts
            .iter()
            .take(CATEGORY_SAMPLE_SIZE)
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(SAMPLE_SEPARATOR);
        let user_prompt = fill(
            templates::CATEGORY_CONTEXT_USER_PROMPT,
            &[("name", name), ("samples", samples.as_str())],
        );
        match self
            .ask(templates::CATEGORY_CONTEXT_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(text) if text.is_empty() => "Analysis failed.".to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!("Category context generation failed: {e}");
                "Error.".to_string()
            }
        }
    }

    /// Generates a customer question the given script would answer.
    pub async fn generate_test_question(&self, script: &Script) -> String {
        let user_prompt = fill(
            templates::TEST_QUESTION_USER_PROMPT,
            &[("content", script.content.as_str())],
        );
        match self
            .ask(templates::TEST_QUESTION_SYSTEM_PROMPT, &user_prompt)
            .await
        {
            Ok(text) if text.is_empty() => "Test question failed.".to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!("Test question generation failed: {e}");
                "Error.".to_string()
            }
        }
    }

    /// Returns whether the provider answers a trivial request.
    pub async fn verify_connection(&self) -> bool {
        match self
            .ask(
                templates::CONNECTION_CHECK_SYSTEM_PROMPT,
                templates::CONNECTION_CHECK_USER_PROMPT,
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Connection check failed: {e}");
                false
            }
        }
    }

    /// Analyzes each line of `text` longer than five characters and adds it
    /// as a script bound to the category. Returns the added scripts.
    ///
    /// Scripts land in the category's bank, else its group's bank, else
    /// `kb_general`. Nothing is stored when any analysis fails.
    #[instrument(skip(self, store, text))]
    pub async fn analyze_and_add_scripts(
        &self,
        store: &Store,
        category_id: &str,
        text: &str,
    ) -> Result<Vec<Script>, AuthoringError> {
        let state = store.snapshot().await;
        let category = state
            .category(category_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "category",
                id: category_id.to_string(),
            })?;
        let kb_id = category
            .kb_id
            .clone()
            .or_else(|| group_of(&state.taxonomy, category).and_then(|g| g.kb_id.clone()))
            .unwrap_or_else(|| DEFAULT_KB_ID.to_string());

        let analyzer = BatchClassifier::new(self.provider.clone(), self.language);
        let candidates = vec![category.name.clone()];
        let mut scripts = Vec::new();
        for line in text
            .lines()
            .map(str::trim)
            .filter(|l| l.chars().count() > MIN_LINE_CHARS)
        {
            let analysis = analyzer.analyze_content(line, &candidates).await?;
            scripts.push(Script {
                id: new_id("SCR-AUTO"),
                content: line.to_string(),
                primary_intent: analysis.intent,
                category: category.name.clone(),
                keywords: analysis.keywords,
                confidence: MANUAL_SCRIPT_CONFIDENCE,
                status: ScriptStatus::Processed,
                kb_id: kb_id.clone(),
                is_golden: false,
            });
        }

        if !scripts.is_empty() {
            store.dispatch(Action::AddScripts(scripts.clone())).await?;
            info!("Added {} script(s) to '{}'.", scripts.len(), category.name);
        }
        Ok(scripts)
    }
}

/// Walks up to the root of `category`'s tree.
fn group_of<'a>(
    taxonomy: &'a [TaxonomyCategory],
    category: &'a TaxonomyCategory,
) -> Option<&'a TaxonomyCategory> {
    let mut current = category;
    // Bounded by the tree size in case the stored tree holds a cycle.
    for _ in 0..=taxonomy.len() {
        match current.parent_id.as_deref() {
            None => return Some(current),
            Some(parent_id) => current = taxonomy.iter().find(|c| c.id == parent_id)?,
        }
    }
    None
}

/// Turns an operator's corrected reply into golden data.
///
/// The returned action replaces the log's reply, marks it `CORRECTED` and
/// stores a golden script in the bot's first bank.
pub fn correct_response(log: &AgentLog, corrected: &str, bot: Option<&Bot>) -> Action {
    let mut keywords = vec![log.intent.clone()];
    keywords.extend(
        log.user_input
            .split(' ')
            .filter(|w| w.chars().count() > 3)
            .map(String::from),
    );
    let kb_id = bot
        .and_then(|b| b.kb_ids.first().cloned())
        .unwrap_or_else(|| DEFAULT_KB_ID.to_string());

    Action::CorrectAgentLog {
        log_id: log.id.clone(),
        corrected_response: corrected.to_string(),
        golden_script: Script {
            id: new_id("SCR-PLAY"),
            content: corrected.to_string(),
            primary_intent: log.intent.clone(),
            category: log.category.clone(),
            keywords,
            confidence: 1.0,
            status: ScriptStatus::Processed,
            kb_id,
            is_golden: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogStatus, TokenUsage};
    use chrono::Utc;

    fn log() -> AgentLog {
        AgentLog {
            id: "LOG-1".to_string(),
            timestamp: Utc::now(),
            user_input: "kargom nerede acaba".to_string(),
            ai_response: "Bilmiyorum.".to_string(),
            intent: "shipping_status".to_string(),
            category: "Kargo".to_string(),
            confidence: 0.4,
            status: LogStatus::Verified,
            reasoning: String::new(),
            source_script_id: None,
            reference_kb_id: None,
            sentiment: None,
            duration_ms: None,
            token_usage: TokenUsage::default(),
        }
    }

    #[test]
    fn correction_builds_a_golden_script() {
        let bot = Bot::new("Ada", "support", vec!["KB-9".to_string()]);
        let Action::CorrectAgentLog {
            log_id,
            corrected_response,
            golden_script,
        } = correct_response(&log(), "Kargonuz yolda.", Some(&bot))
        else {
            panic!("expected a correction action");
        };
        assert_eq!(log_id, "LOG-1");
        assert_eq!(corrected_response, "Kargonuz yolda.");
        assert!(golden_script.is_golden);
        assert_eq!(golden_script.confidence, 1.0);
        assert_eq!(golden_script.kb_id, "KB-9");
        assert_eq!(
            golden_script.keywords,
            vec!["shipping_status", "kargom", "nerede", "acaba"]
        );
        assert!(golden_script.id.starts_with("SCR-PLAY-"));
    }

    #[test]
    fn correction_without_bot_uses_general_bank() {
        let Action::CorrectAgentLog { golden_script, .. } = correct_response(&log(), "x", None)
        else {
            panic!("expected a correction action");
        };
        assert_eq!(golden_script.kb_id, "kb_general");
    }

    #[test]
    fn group_lookup_walks_to_the_root() {
        let mut root = TaxonomyCategory::new("g".to_string(), "Group", None);
        root.kb_id = Some("KB-G".to_string());
        let mid = TaxonomyCategory::new("m".to_string(), "Mid", Some("g".to_string()));
        let leaf = TaxonomyCategory::new("l".to_string(), "Leaf", Some("m".to_string()));
        let tree = vec![root, mid, leaf.clone()];
        assert_eq!(group_of(&tree, &leaf).map(|g| g.id.as_str()), Some("g"));
    }
}
