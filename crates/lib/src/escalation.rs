//! # Escalation Rules
//!
//! A rule fires for an agent log when it is active and every one of its
//! triggers matches. Actions are reported with the match; nothing here sends
//! email or calls webhooks.

use crate::types::{
    AgentLog, EscalationAction, EscalationRule, EscalationTrigger, Sentiment, TriggerCondition,
    TriggerType,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Rule name must not be blank")]
    BlankName,
    #[error("A rule needs at least one trigger")]
    NoTriggers,
    #[error("A rule needs at least one action")]
    NoActions,
    #[error("Condition '{condition:?}' does not apply to a '{trigger_type:?}' trigger")]
    InvalidCondition {
        trigger_type: TriggerType,
        condition: TriggerCondition,
    },
    #[error("Invalid trigger value '{0}'")]
    InvalidValue(String),
}

/// Splits a comma-separated tag list, dropping empty entries.
pub fn tags(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Appends a tag to a comma-separated keyword value. Blank and repeated
/// tags are ignored.
pub fn add_tag(value: &str, tag: &str) -> String {
    let tag = tag.trim();
    let mut current = tags(value);
    if !tag.is_empty() && !current.contains(&tag) {
        current.push(tag);
    }
    current.join(",")
}

/// Removes every occurrence of a tag from a comma-separated keyword value.
pub fn remove_tag(value: &str, tag: &str) -> String {
    tags(value)
        .into_iter()
        .filter(|t| *t != tag.trim())
        .collect::<Vec<_>>()
        .join(",")
}

impl EscalationTrigger {
    fn validate(&self) -> Result<(), RuleError> {
        let allowed = match self.trigger_type {
            TriggerType::ConfidenceScore => matches!(
                self.condition,
                TriggerCondition::IsBelow | TriggerCondition::IsAbove
            ),
            TriggerType::Keyword | TriggerType::Intent => matches!(
                self.condition,
                TriggerCondition::Contains | TriggerCondition::Equals
            ),
            TriggerType::Sentiment => self.condition == TriggerCondition::Is,
        };
        if !allowed {
            return Err(RuleError::InvalidCondition {
                trigger_type: self.trigger_type,
                condition: self.condition,
            });
        }

        let valid_value = match self.trigger_type {
            TriggerType::ConfidenceScore => self.value.trim().parse::<f64>().is_ok(),
            TriggerType::Keyword => !tags(&self.value).is_empty(),
            TriggerType::Intent => !self.value.trim().is_empty(),
            TriggerType::Sentiment => Sentiment::parse(&self.value).is_some(),
        };
        if !valid_value {
            return Err(RuleError::InvalidValue(self.value.clone()));
        }
        Ok(())
    }

    /// Whether this trigger matches the log.
    pub fn matches(&self, log: &AgentLog) -> bool {
        match self.trigger_type {
            TriggerType::ConfidenceScore => {
                let Ok(threshold) = self.value.trim().parse::<f64>() else {
                    return false;
                };
                match self.condition {
                    TriggerCondition::IsBelow => log.confidence < threshold,
                    TriggerCondition::IsAbove => log.confidence > threshold,
                    _ => false,
                }
            }
            TriggerType::Keyword => {
                let input = log.user_input.to_lowercase();
                let mut keywords = tags(&self.value).into_iter().map(str::to_lowercase);
                match self.condition {
                    TriggerCondition::Equals => keywords.any(|k| input.trim() == k),
                    _ => keywords.any(|k| input.contains(&k)),
                }
            }
            TriggerType::Intent => {
                let intent = log.intent.to_lowercase();
                let wanted = self.value.trim().to_lowercase();
                match self.condition {
                    TriggerCondition::Contains => !wanted.is_empty() && intent.contains(&wanted),
                    _ => intent == wanted,
                }
            }
            TriggerType::Sentiment => {
                Sentiment::parse(&self.value).is_some_and(|wanted| log.sentiment == Some(wanted))
            }
        }
    }
}

impl EscalationRule {
    /// Checks that the rule can be saved.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.name.trim().is_empty() {
            return Err(RuleError::BlankName);
        }
        if self.triggers.is_empty() {
            return Err(RuleError::NoTriggers);
        }
        if self.actions.is_empty() {
            return Err(RuleError::NoActions);
        }
        self.triggers.iter().try_for_each(EscalationTrigger::validate)
    }

    /// Active and every trigger matches.
    pub fn fires_for(&self, log: &AgentLog) -> bool {
        self.is_active && !self.triggers.is_empty() && self.triggers.iter().all(|t| t.matches(log))
    }
}

/// A rule that fired, with the actions an operator would expect to run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationMatch {
    pub rule_id: String,
    pub rule_name: String,
    pub actions: Vec<EscalationAction>,
}

/// Returns a match for every rule that fires for the log, in rule order.
pub fn evaluate(rules: &[EscalationRule], log: &AgentLog) -> Vec<EscalationMatch> {
    rules
        .iter()
        .filter(|rule| rule.fires_for(log))
        .map(|rule| EscalationMatch {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            actions: rule.actions.clone(),
        })
        .collect()
}
