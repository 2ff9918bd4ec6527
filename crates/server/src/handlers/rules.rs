//! # Escalation Rule Handlers
//!
//! Invalid rules (blank name, no triggers or actions, a malformed trigger
//! value) are rejected with 400 by the store.

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use anybot::{
    types::{new_id, EscalationAction, EscalationRule, EscalationTrigger},
    Action,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub triggers: Vec<EscalationTrigger>,
    #[serde(default)]
    pub actions: Vec<EscalationAction>,
}

fn default_active() -> bool {
    true
}

impl RulePayload {
    fn into_rule(self, id: String) -> EscalationRule {
        EscalationRule {
            id,
            name: self.name.trim().to_string(),
            is_active: self.is_active,
            triggers: self.triggers,
            actions: self.actions,
        }
    }
}

pub async fn list_rules_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<EscalationRule>>>, AppError> {
    let rules = app_state.store.read(|s| s.escalation_rules.clone()).await;
    Ok(wrap_response(rules, debug_params, None))
}

pub async fn create_rule_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<RulePayload>,
) -> Result<Json<ApiResponse<EscalationRule>>, AppError> {
    let rule = payload.into_rule(new_id("RULE"));
    app_state
        .store
        .dispatch(Action::AddEscalationRule(rule.clone()))
        .await?;
    Ok(wrap_response(rule, debug_params, None))
}

pub async fn update_rule_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<RulePayload>,
) -> Result<Json<ApiResponse<EscalationRule>>, AppError> {
    let rule = payload.into_rule(id);
    app_state
        .store
        .dispatch(Action::UpdateEscalationRule(rule.clone()))
        .await?;
    Ok(wrap_response(rule, debug_params, None))
}

pub async fn delete_rule_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    app_state
        .store
        .dispatch(Action::DeleteEscalationRule(id.clone()))
        .await?;
    Ok(wrap_response(id, debug_params, None))
}
