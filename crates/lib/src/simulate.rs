//! # Conversational Simulator
//!
//! Produces one simulated agent turn: a naive substring shortlist picks the
//! knowledge, a single schema-constrained request produces the reply and its
//! classification, and the result is wrapped as an `AgentLog`.

use crate::{
    classify::parse_json_body,
    errors::PromptError,
    escalation::{self, EscalationMatch},
    materialize::resolve_confidence,
    prompts::{fill, simulation as templates, with_language},
    providers::ai::{AiProvider, GenerationOptions},
    store::{Action, Store, StoreError},
    types::{
        new_id, AgentLog, Bot, Language, LanguageMode, LogStatus, PromptStyle, Script, Sentiment,
        Tone,
    },
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const SHORTLIST_LIMIT: usize = 5;
const MATCH_SCORE: u32 = 50;
const KNOWLEDGE_SEPARATOR: &str = "\n---\n";

const FALLBACK_REPLY: &str = "No reply.";
const FALLBACK_LABEL: &str = "General";

/// Picks at most five scripts whose content contains the lowercased input.
///
/// Every match scores the same, so matches keep their original order.
pub fn shortlist<'a>(input: &str, scripts: &'a [Script]) -> Vec<&'a Script> {
    let needle = input.to_lowercase();
    scripts
        .iter()
        .map(|script| {
            let score = if script.content.to_lowercase().contains(&needle) {
                MATCH_SCORE
            } else {
                0
            };
            (script, score)
        })
        .filter(|(_, score)| *score > 0)
        .take(SHORTLIST_LIMIT)
        .map(|(script, _)| script)
        .collect()
}

fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "Keep a professional tone.",
        Tone::Friendly => "Keep a warm and friendly tone.",
        Tone::Concise => "Be brief and to the point.",
        Tone::Instructional => "Explain step by step, like a guide.",
    }
}

fn style_instruction(style: PromptStyle) -> &'static str {
    match style {
        PromptStyle::Direct => "Answer directly.",
        PromptStyle::Polite => "Be courteous and thank the customer where it fits.",
        PromptStyle::Inquisitive => "Ask a clarifying question when the request is ambiguous.",
        PromptStyle::Concise => "Use as few sentences as possible.",
    }
}

/// The persona block of the system prompt for a bot.
fn persona(bot: &Bot) -> String {
    let mut lines = Vec::new();
    match bot.system_prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => lines.push(prompt.to_string()),
        _ if !bot.role.is_empty() => lines.push(format!("You are {}, {}.", bot.name, bot.role)),
        _ => lines.push(format!("You are {}, a customer support assistant.", bot.name)),
    }
    lines.push(tone_instruction(bot.tone).to_string());
    lines.push(style_instruction(bot.prompt_style).to_string());
    lines.push(format!(
        "Keep the reply under {} characters.",
        bot.max_response_length
    ));
    lines.join("\n")
}

fn language_rule(bot: Option<&Bot>, language: Language) -> String {
    let mode = bot.map(|b| b.language_mode).unwrap_or(match language {
        Language::Tr => LanguageMode::Tr,
        Language::En => LanguageMode::En,
    });
    match mode {
        LanguageMode::Auto => "Reply in the same language the customer writes in.".to_string(),
        LanguageMode::Tr => with_language("Reply in {language}.", Language::Tr),
        LanguageMode::En => with_language("Reply in {language}.", Language::En),
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Runs simulated agent turns against an `AiProvider`.
#[derive(Debug, Clone)]
pub struct Simulator {
    provider: Box<dyn AiProvider>,
    language: Language,
    temperature: Option<f32>,
    top_p: Option<f32>,
}

impl Simulator {
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

    /// Simulates one turn. Provider errors are returned as-is; the caller
    /// decides how to degrade.
    #[instrument(skip_all, fields(bot = bot.map(|b| b.id.as_str())))]
    pub async fn simulate_turn(
        &self,
        input: &str,
        scripts: &[Script],
        bot: Option<&Bot>,
    ) -> Result<AgentLog, PromptError> {
        let timestamp = Utc::now();
        let started = Instant::now();

        let candidates: Vec<Script> = match bot {
            Some(bot) => scripts
                .iter()
                .filter(|s| bot.kb_ids.contains(&s.kb_id))
                .cloned()
                .collect(),
            None => scripts.to_vec(),
        };
        let matches = shortlist(input, &candidates);
        let knowledge = matches
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(KNOWLEDGE_SEPARATOR);
        debug!("Shortlisted {} of {} candidate script(s).", matches.len(), candidates.len());

        let persona_text = bot
            .map(persona)
            .unwrap_or_else(|| templates::DEFAULT_PERSONA.to_string());
        let system_prompt = fill(
            templates::AGENT_TURN_SYSTEM_PROMPT,
            &[
                ("persona", persona_text.as_str()),
                ("language_rule", language_rule(bot, self.language).as_str()),
            ],
        );
        let user_prompt = fill(
            templates::AGENT_TURN_USER_PROMPT,
            &[("input", input), ("knowledge", knowledge.as_str())],
        );

        let temperature = bot.map(|b| b.temperature).or(self.temperature);
        let options =
            GenerationOptions::json(templates::turn_schema()).with_sampling(temperature, self.top_p);

        let generation = self
            .provider
            .generate(&system_prompt, &user_prompt, &options)
            .await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let data = parse_json_body(&generation.text).unwrap_or(Value::Null);

        let top_match = matches.first();
        let log = AgentLog {
            id: new_id("LOG"),
            timestamp,
            user_input: input.to_string(),
            ai_response: text_field(&data, "reply").unwrap_or_else(|| FALLBACK_REPLY.to_string()),
            intent: text_field(&data, "intent").unwrap_or_else(|| FALLBACK_LABEL.to_string()),
            category: text_field(&data, "category").unwrap_or_else(|| FALLBACK_LABEL.to_string()),
            confidence: resolve_confidence(data.get("confidence").and_then(Value::as_f64)),
            status: LogStatus::Verified,
            reasoning: text_field(&data, "reasoning").unwrap_or_default(),
            source_script_id: top_match.map(|s| s.id.clone()),
            reference_kb_id: top_match.map(|s| s.kb_id.clone()),
            sentiment: text_field(&data, "sentiment").and_then(|s| Sentiment::parse(&s)),
            duration_ms: Some(duration_ms),
            token_usage: generation.usage.unwrap_or_default(),
        };
        info!(log_id = %log.id, duration_ms, "Simulated agent turn.");
        Ok(log)
    }
}

/// The static reply used when a turn cannot be simulated.
pub fn apology(language: Language) -> &'static str {
    match language {
        Language::Tr => "Üzgünüm, şu an yanıt veremiyorum.",
        Language::En => "Sorry, I can't respond right now.",
    }
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Message must not be blank")]
    BlankInput,
    #[error("Bot not found: {0}")]
    UnknownBot(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the operator sees after sending one message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub reply: String,
    /// The stored log, absent when the turn degraded to the apology.
    pub log: Option<AgentLog>,
    pub escalations: Vec<EscalationMatch>,
    pub degraded: bool,
}

/// A playground conversation with an optional bot, backed by the store.
#[derive(Debug, Clone)]
pub struct ChatSession {
    store: Store,
    provider: Box<dyn AiProvider>,
    bot_id: Option<String>,
}

impl ChatSession {
    pub fn new(store: Store, provider: Box<dyn AiProvider>, bot_id: Option<String>) -> Self {
        Self {
            store,
            provider,
            bot_id,
        }
    }

    /// Sends one message.
    ///
    /// Simulation failures degrade to the apology and store nothing. A
    /// successful turn is checked against the active escalation rules, marked
    /// `REFLECTED` when any fires, and stored.
    pub async fn send(&self, input: &str) -> Result<ChatTurn, ChatError> {
        if input.trim().is_empty() {
            return Err(ChatError::BlankInput);
        }

        let state = self.store.snapshot().await;
        let bot = match &self.bot_id {
            Some(id) => Some(
                state
                    .bot(id)
                    .cloned()
                    .ok_or_else(|| ChatError::UnknownBot(id.clone()))?,
            ),
            None => None,
        };

        let simulator = Simulator::new(self.provider.clone(), state.settings.language)
            .with_sampling(state.settings.temperature, state.settings.top_p);

        let mut log = match simulator
            .simulate_turn(input, &state.scripts, bot.as_ref())
            .await
        {
            Ok(log) => log,
            Err(e) => {
                warn!("Chat simulation failed, replying with apology: {e}");
                return Ok(ChatTurn {
                    reply: apology(state.settings.language).to_string(),
                    log: None,
                    escalations: Vec::new(),
                    degraded: true,
                });
            }
        };

        let escalations = escalation::evaluate(&state.escalation_rules, &log);
        if !escalations.is_empty() {
            info!(log_id = %log.id, rules = escalations.len(), "Escalation rule(s) fired.");
            log.status = LogStatus::Reflected;
        }

        self.store.dispatch(Action::AddAgentLog(log.clone())).await?;
        Ok(ChatTurn {
            reply: log.ai_response.clone(),
            log: Some(log),
            escalations,
            degraded: false,
        })
    }
}
