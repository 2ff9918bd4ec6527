//! The application state and the reducer that mutates it.

use crate::{
    store::{backend::StateEntries, StoreError},
    taxonomy::{self, CategoryUpdate, TaxonomyDelta},
    types::{
        AgentLog, Bot, EscalationRule, KnowledgeBank, Language, LogStatus, Script,
        Settings, TaxonomyCategory,
    },
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const KEY_KNOWLEDGE_BANKS: &str = "knowledge_banks";
pub const KEY_SCRIPTS: &str = "scripts";
pub const KEY_AGENT_LOGS: &str = "agent_logs";
pub const KEY_TAXONOMY: &str = "taxonomy";
pub const KEY_BOTS: &str = "bots";
pub const KEY_ESCALATION_RULES: &str = "escalation_rules";
pub const KEY_LANGUAGE: &str = "lang";
pub const KEY_ACTIVE_MODEL: &str = "active_model";
pub const KEY_TEMPERATURE: &str = "temperature";
pub const KEY_TOP_P: &str = "top_p";

/// Everything the console keeps. Collections are newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub knowledge_banks: Vec<KnowledgeBank>,
    pub scripts: Vec<Script>,
    pub agent_logs: Vec<AgentLog>,
    pub taxonomy: Vec<TaxonomyCategory>,
    pub bots: Vec<Bot>,
    pub escalation_rules: Vec<EscalationRule>,
    pub settings: Settings,
}

/// A partial settings change. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub language: Option<Language>,
    pub active_model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// Every mutation the console can make.
#[derive(Debug, Clone)]
pub enum Action {
    AddKnowledgeBank(KnowledgeBank),
    UpdateKnowledgeBank(KnowledgeBank),
    DeleteKnowledgeBank(String),
    /// New scripts go in front of the existing ones.
    AddScripts(Vec<Script>),
    UpdateScript(Script),
    DeleteScript(String),
    /// Turning golden on pins the confidence to 1.0.
    ToggleGolden(String),
    AddAgentLog(AgentLog),
    UpdateAgentLog(AgentLog),
    /// Replaces the log's reply, marks it corrected and stores the golden script.
    CorrectAgentLog {
        log_id: String,
        corrected_response: String,
        golden_script: Script,
    },
    AddBot(Bot),
    UpdateBot(Bot),
    DeleteBot(String),
    AddEscalationRule(EscalationRule),
    UpdateEscalationRule(EscalationRule),
    DeleteEscalationRule(String),
    AddCategory(TaxonomyCategory),
    BulkImportCategories {
        parent_id: Option<String>,
        lines: String,
        kb_id: Option<String>,
    },
    UpdateCategory {
        id: String,
        update: CategoryUpdate,
    },
    /// Removes the category and its subtree.
    RemoveCategory(String),
    /// The single write at the end of an ingestion run.
    CommitIngestion {
        kb_id: String,
        taxonomy: TaxonomyDelta,
        scripts: Vec<Script>,
    },
    UpdateSettings(SettingsUpdate),
    Reset,
}

fn not_found(kind: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn replace_by_id<T>(
    items: &mut [T],
    item: T,
    id_of: impl Fn(&T) -> &str,
    kind: &'static str,
) -> Result<(), StoreError> {
    let id = id_of(&item).to_string();
    let slot = items
        .iter_mut()
        .find(|existing| id_of(existing) == id)
        .ok_or_else(|| not_found(kind, &id))?;
    *slot = item;
    Ok(())
}

fn remove_by_id<T>(
    items: &mut Vec<T>,
    id: &str,
    id_of: impl Fn(&T) -> &str,
    kind: &'static str,
) -> Result<(), StoreError> {
    let before = items.len();
    items.retain(|item| id_of(item) != id);
    if items.len() == before {
        return Err(not_found(kind, id));
    }
    Ok(())
}

fn prepend<T>(items: &mut Vec<T>, new_items: Vec<T>) {
    items.splice(0..0, new_items);
}

impl AppState {
    /// Applies one action. On error the state may be partially changed, so
    /// callers apply actions to a copy.
    pub fn apply(&mut self, action: Action) -> Result<(), StoreError> {
        match action {
            Action::AddKnowledgeBank(bank) => {
                if self.knowledge_banks.iter().any(|kb| kb.id == bank.id) {
                    return Err(StoreError::Duplicate {
                        kind: "knowledge bank",
                        id: bank.id,
                    });
                }
                self.knowledge_banks.insert(0, bank);
            }
            Action::UpdateKnowledgeBank(bank) => {
                replace_by_id(&mut self.knowledge_banks, bank, |kb| kb.id.as_str(), "knowledge bank")?
            }
            Action::DeleteKnowledgeBank(id) => {
                remove_by_id(&mut self.knowledge_banks, &id, |kb| kb.id.as_str(), "knowledge bank")?
            }
            Action::AddScripts(scripts) => prepend(&mut self.scripts, scripts),
            Action::UpdateScript(script) => {
                replace_by_id(&mut self.scripts, script, |s| s.id.as_str(), "script")?
            }
            Action::DeleteScript(id) => remove_by_id(&mut self.scripts, &id, |s| s.id.as_str(), "script")?,
            Action::ToggleGolden(id) => {
                let script = self
                    .scripts
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or_else(|| not_found("script", &id))?;
                script.is_golden = !script.is_golden;
                if script.is_golden {
                    script.confidence = 1.0;
                }
            }
            Action::AddAgentLog(log) => self.agent_logs.insert(0, log),
            Action::UpdateAgentLog(log) => {
                replace_by_id(&mut self.agent_logs, log, |l| l.id.as_str(), "agent log")?
            }
            Action::CorrectAgentLog {
                log_id,
                corrected_response,
                golden_script,
            } => {
                let log = self
                    .agent_logs
                    .iter_mut()
                    .find(|l| l.id == log_id)
                    .ok_or_else(|| not_found("agent log", &log_id))?;
                log.ai_response = corrected_response;
                log.status = LogStatus::Corrected;
                self.scripts.insert(0, golden_script);
            }
            Action::AddBot(bot) => self.bots.insert(0, bot),
            Action::UpdateBot(bot) => replace_by_id(&mut self.bots, bot, |b| b.id.as_str(), "bot")?,
            Action::DeleteBot(id) => remove_by_id(&mut self.bots, &id, |b| b.id.as_str(), "bot")?,
            Action::AddEscalationRule(rule) => {
                rule.validate()?;
                self.escalation_rules.insert(0, rule);
            }
            Action::UpdateEscalationRule(rule) => {
                rule.validate()?;
                replace_by_id(&mut self.escalation_rules, rule, |r| r.id.as_str(), "escalation rule")?
            }
            Action::DeleteEscalationRule(id) => {
                remove_by_id(&mut self.escalation_rules, &id, |r| r.id.as_str(), "escalation rule")?
            }
            Action::AddCategory(category) => taxonomy::add_category(&mut self.taxonomy, category)?,
            Action::BulkImportCategories {
                parent_id,
                lines,
                kb_id,
            } => {
                taxonomy::bulk_import(
                    &mut self.taxonomy,
                    parent_id.as_deref(),
                    &lines,
                    kb_id.as_deref(),
                )?;
            }
            Action::UpdateCategory { id, update } => {
                taxonomy::update_category(&mut self.taxonomy, &id, update)?
            }
            Action::RemoveCategory(id) => {
                taxonomy::remove_category(&mut self.taxonomy, &id)?;
            }
            Action::CommitIngestion {
                kb_id,
                taxonomy,
                mut scripts,
            } => {
                taxonomy.merge_into(&mut self.taxonomy, &mut scripts)?;
                let added = scripts.len();
                prepend(&mut self.scripts, scripts);
                match self.knowledge_banks.iter_mut().find(|kb| kb.id == kb_id) {
                    Some(bank) => {
                        bank.document_count += added;
                        bank.updated_at = Utc::now();
                    }
                    None => warn!("Knowledge bank '{kb_id}' disappeared during ingestion."),
                }
            }
            Action::UpdateSettings(update) => self.apply_settings(update)?,
            Action::Reset => *self = AppState::default(),
        }
        Ok(())
    }

    fn apply_settings(&mut self, update: SettingsUpdate) -> Result<(), StoreError> {
        if let Some(temperature) = update.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(StoreError::InvalidSetting(format!(
                    "temperature must be between 0 and 2, got {temperature}"
                )));
            }
            self.settings.temperature = temperature;
        }
        if let Some(top_p) = update.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(StoreError::InvalidSetting(format!(
                    "top_p must be between 0 and 1, got {top_p}"
                )));
            }
            self.settings.top_p = top_p;
        }
        if let Some(model) = update.active_model {
            if model.trim().is_empty() {
                return Err(StoreError::InvalidSetting(
                    "active model must not be blank".to_string(),
                ));
            }
            self.settings.active_model = model.trim().to_string();
        }
        if let Some(language) = update.language {
            self.settings.language = language;
        }
        Ok(())
    }

    pub fn knowledge_bank(&self, id: &str) -> Option<&KnowledgeBank> {
        self.knowledge_banks.iter().find(|kb| kb.id == id)
    }

    pub fn bot(&self, id: &str) -> Option<&Bot> {
        self.bots.iter().find(|b| b.id == id)
    }

    pub fn agent_log(&self, id: &str) -> Option<&AgentLog> {
        self.agent_logs.iter().find(|l| l.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&TaxonomyCategory> {
        self.taxonomy.iter().find(|c| c.id == id)
    }

    /// Flattens the state into the persisted key/value namespace.
    pub fn to_entries(&self) -> Result<StateEntries, StoreError> {
        let mut entries = StateEntries::new();
        entries.insert(KEY_KNOWLEDGE_BANKS.into(), serde_json::to_value(&self.knowledge_banks)?);
        entries.insert(KEY_SCRIPTS.into(), serde_json::to_value(&self.scripts)?);
        entries.insert(KEY_AGENT_LOGS.into(), serde_json::to_value(&self.agent_logs)?);
        entries.insert(KEY_TAXONOMY.into(), serde_json::to_value(&self.taxonomy)?);
        entries.insert(KEY_BOTS.into(), serde_json::to_value(&self.bots)?);
        entries.insert(KEY_ESCALATION_RULES.into(), serde_json::to_value(&self.escalation_rules)?);
        entries.insert(KEY_LANGUAGE.into(), serde_json::to_value(self.settings.language)?);
        entries.insert(KEY_ACTIVE_MODEL.into(), Value::from(self.settings.active_model.clone()));
        entries.insert(KEY_TEMPERATURE.into(), serde_json::to_value(self.settings.temperature)?);
        entries.insert(KEY_TOP_P.into(), serde_json::to_value(self.settings.top_p)?);
        Ok(entries)
    }

    /// Rebuilds the state from persisted entries. Missing keys take their
    /// default; a present but unreadable key is an error.
    pub fn from_entries(entries: &StateEntries) -> Result<Self, StoreError> {
        fn read<T: DeserializeOwned>(
            entries: &StateEntries,
            key: &'static str,
            default: T,
        ) -> Result<T, StoreError> {
            match entries.get(key) {
                None | Some(Value::Null) => Ok(default),
                Some(value) => serde_json::from_value(value.clone())
                    .map_err(|source| StoreError::Corrupt { key, source }),
            }
        }

        let defaults = Settings::default();
        Ok(Self {
            knowledge_banks: read(entries, KEY_KNOWLEDGE_BANKS, Vec::new())?,
            scripts: read(entries, KEY_SCRIPTS, Vec::new())?,
            agent_logs: read(entries, KEY_AGENT_LOGS, Vec::new())?,
            taxonomy: read(entries, KEY_TAXONOMY, Vec::new())?,
            bots: read(entries, KEY_BOTS, Vec::new())?,
            escalation_rules: read(entries, KEY_ESCALATION_RULES, Vec::new())?,
            settings: Settings {
                language: read(entries, KEY_LANGUAGE, defaults.language)?,
                active_model: read(entries, KEY_ACTIVE_MODEL, defaults.active_model)?,
                temperature: read(entries, KEY_TEMPERATURE, defaults.temperature)?,
                top_p: read(entries, KEY_TOP_P, defaults.top_p)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScriptStatus, TaxonomyCategory};

    fn script(id: &str) -> Script {
        Script {
            id: id.to_string(),
            content: "c".to_string(),
            primary_intent: "i".to_string(),
            category: "Genel".to_string(),
            keywords: vec![],
            confidence: 0.6,
            status: ScriptStatus::Processed,
            kb_id: "KB-1".to_string(),
            is_golden: false,
        }
    }

    #[test]
    fn scripts_are_prepended_in_batch_order() {
        let mut state = AppState::default();
        state.apply(Action::AddScripts(vec![script("a")])).unwrap();
        state
            .apply(Action::AddScripts(vec![script("b"), script("c")]))
            .unwrap();
        let ids: Vec<_> = state.scripts.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn golden_toggle_pins_confidence() {
        let mut state = AppState::default();
        state.apply(Action::AddScripts(vec![script("a")])).unwrap();
        state.apply(Action::ToggleGolden("a".to_string())).unwrap();
        assert!(state.scripts[0].is_golden);
        assert_eq!(state.scripts[0].confidence, 1.0);
        state.apply(Action::ToggleGolden("a".to_string())).unwrap();
        assert!(!state.scripts[0].is_golden);
        assert_eq!(state.scripts[0].confidence, 1.0);
    }

    #[test]
    fn missing_ids_are_reported() {
        let mut state = AppState::default();
        let err = state.apply(Action::DeleteBot("nope".to_string())).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "bot", .. }));
    }

    #[test]
    fn commit_ingestion_grows_the_bank() {
        let mut state = AppState::default();
        let bank = KnowledgeBank::new("Destek", "", vec![]);
        let kb_id = bank.id.clone();
        state.apply(Action::AddKnowledgeBank(bank)).unwrap();

        let root = TaxonomyCategory::new("ROOT".to_string(), "FAQ.CSV", None);
        state
            .apply(Action::CommitIngestion {
                kb_id: kb_id.clone(),
                taxonomy: TaxonomyDelta {
                    created: vec![root],
                    ..Default::default()
                },
                scripts: vec![script("a"), script("b")],
            })
            .unwrap();

        assert_eq!(state.knowledge_bank(&kb_id).unwrap().document_count, 2);
        assert_eq!(state.taxonomy.len(), 1);
        assert_eq!(state.scripts.len(), 2);
    }

    #[test]
    fn settings_are_validated() {
        let mut state = AppState::default();
        let err = state
            .apply(Action::UpdateSettings(SettingsUpdate {
                top_p: Some(1.5),
                ..Default::default()
            }))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSetting(_)));

        state
            .apply(Action::UpdateSettings(SettingsUpdate {
                language: Some(Language::En),
                temperature: Some(0.2),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(state.settings.language, Language::En);
        assert_eq!(state.settings.temperature, 0.2);
    }

    #[test]
    fn entries_round_trip_through_flat_keys() {
        let mut state = AppState::default();
        state.apply(Action::AddScripts(vec![script("a")])).unwrap();
        state.settings.language = Language::En;

        let entries = state.to_entries().unwrap();
        assert!(entries.contains_key(KEY_SCRIPTS));
        assert_eq!(entries[KEY_LANGUAGE], "en");
        assert_eq!(AppState::from_entries(&entries).unwrap(), state);
    }

    #[test]
    fn missing_keys_default_and_bad_keys_fail() {
        let empty = StateEntries::new();
        assert_eq!(AppState::from_entries(&empty).unwrap(), AppState::default());

        let mut bad = StateEntries::new();
        bad.insert(KEY_SCRIPTS.into(), Value::from("not a list"));
        assert!(matches!(
            AppState::from_entries(&bad),
            Err(StoreError::Corrupt { key: KEY_SCRIPTS, .. })
        ));
    }
}
