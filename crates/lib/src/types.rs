//! # Domain Types
//!
//! The entities an operator manages from the console: knowledge banks, the
//! scripts ingested into them, the category taxonomy, bots, simulated agent
//! logs and escalation rules. All of them serialize in camelCase so that the
//! persisted state keeps the shape the console has always written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generates a fresh identifier with a readable prefix, e.g. `KB-1f0c...`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

// --- Knowledge Banks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KbStatus {
    #[default]
    Ready,
    Training,
    Indexing,
    Error,
}

/// A named container for ingested content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: KbStatus,
    #[serde(default)]
    pub document_count: usize,
    #[serde(default)]
    pub agent_count: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy_category_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeBank {
    /// Creates a ready, empty bank. Blank tag input falls back to a single default tag.
    pub fn new(name: &str, description: &str, tags: Vec<String>) -> Self {
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            id: new_id("KB"),
            name: name.trim().to_string(),
            description: if description.trim().is_empty() {
                "...".to_string()
            } else {
                description.trim().to_string()
            },
            status: KbStatus::Ready,
            document_count: 0,
            agent_count: 0,
            tags: if tags.is_empty() {
                vec!["General".to_string()]
            } else {
                tags
            },
            taxonomy_category_id: None,
            updated_at: Utc::now(),
        }
    }
}

// --- Scripts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptStatus {
    #[default]
    Processed,
    Pending,
    Rejected,
}

/// One classified unit of knowledge text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,
    pub content: String,
    pub primary_intent: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub status: ScriptStatus,
    pub kb_id: String,
    #[serde(default)]
    pub is_golden: bool,
}

// --- Taxonomy ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryType {
    #[default]
    Category,
    Intent,
    Entity,
}

/// A node in the category tree. Root nodes ("groups") have no parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyCategory {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_context: Option<String>,
    #[serde(default)]
    pub few_shot_examples: Vec<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(rename = "type", default)]
    pub category_type: CategoryType,
    #[serde(default)]
    pub force_hierarchy: bool,
}

impl TaxonomyCategory {
    pub fn new(id: String, name: &str, parent_id: Option<String>) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            parent_id,
            kb_id: None,
            description: None,
            prompt_context: None,
            few_shot_examples: Vec::new(),
            count: 0,
            category_type: CategoryType::Category,
            force_hierarchy: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// --- Agent Logs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    #[default]
    Verified,
    LowConfidence,
    Reflected,
    Corrected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Urgent,
}

impl Sentiment {
    /// Parses a model-provided label, ignoring case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
            Sentiment::Urgent => "Urgent",
        };
        f.write_str(label)
    }
}

/// Token accounting reported by the provider for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

/// The record of one simulated question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub ai_response: String,
    pub intent: String,
    pub category: String,
    pub confidence: f64,
    pub status: LogStatus,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_script_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_kb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub token_usage: TokenUsage,
}

// --- Bots ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    #[default]
    Active,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Concise,
    Instructional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PromptStyle {
    #[default]
    Direct,
    Polite,
    Inquisitive,
    Concise,
}

/// Which language a bot answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageMode {
    /// Mirror the customer's language.
    #[default]
    Auto,
    Tr,
    En,
}

/// A configured persona bound to one or more knowledge banks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub kb_ids: Vec<String>,
    pub temperature: f32,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub status: BotStatus,
    pub max_response_length: usize,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub prompt_style: PromptStyle,
    #[serde(default)]
    pub language_mode: LanguageMode,
}

impl Bot {
    /// Creates an active bot with the console's defaults.
    pub fn new(name: &str, role: &str, kb_ids: Vec<String>) -> Self {
        Self {
            id: new_id("BOT"),
            name: name.trim().to_string(),
            role: role.trim().to_string(),
            kb_ids,
            temperature: 0.7,
            welcome_message: "Merhaba!".to_string(),
            system_prompt: None,
            status: BotStatus::Active,
            max_response_length: 500,
            tone: Tone::Professional,
            prompt_style: PromptStyle::Direct,
            language_mode: LanguageMode::Auto,
        }
    }
}

// --- Escalation Rules ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    #[serde(rename = "Confidence Score")]
    ConfidenceScore,
    Keyword,
    Intent,
    Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerCondition {
    #[serde(rename = "Is below")]
    IsBelow,
    #[serde(rename = "Is above")]
    IsAbove,
    Contains,
    Equals,
    Is,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationTrigger {
    pub id: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    pub condition: TriggerCondition,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "Send Email")]
    SendEmail,
    Webhook,
    #[serde(rename = "Transfer to Human")]
    TransferToHuman,
    #[serde(rename = "Slack Notification")]
    SlackNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationAction {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A condition-to-action mapping for flagging urgent conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRule {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub triggers: Vec<EscalationTrigger>,
    #[serde(default)]
    pub actions: Vec<EscalationAction>,
}

// --- Settings ---

/// The console language, which also selects the language of AI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Tr,
    En,
}

impl Language {
    /// The upper-case name used inside prompts ("output must be in TURKISH").
    pub fn prompt_name(self) -> &'static str {
        match self {
            Language::Tr => "TURKISH",
            Language::En => "ENGLISH",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tr" => Ok(Language::Tr),
            "en" => Ok(Language::En),
            other => Err(format!("unsupported language '{other}' (expected 'tr' or 'en')")),
        }
    }
}

/// Scalar settings persisted alongside the collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub language: Language,
    pub active_model: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: Language::Tr,
            active_model: "gemini-3-flash".to_string(),
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}
