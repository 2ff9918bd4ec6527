//! # Knowledge Bank and Script Handlers

use super::{authoring, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::{CreateKnowledgeBankRequest, ScriptQuery, TextResult};
use anybot::{
    types::{KnowledgeBank, Script},
    Action,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::json;
use tracing::info;

// --- Knowledge banks ---

pub async fn list_banks_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<KnowledgeBank>>>, AppError> {
    let banks = app_state.store.read(|s| s.knowledge_banks.clone()).await;
    Ok(wrap_response(banks, debug_params, None))
}

pub async fn create_bank_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateKnowledgeBankRequest>,
) -> Result<Json<ApiResponse<KnowledgeBank>>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Knowledge bank name must not be blank.".to_string(),
        ));
    }
    let mut bank = KnowledgeBank::new(&payload.name, &payload.description, payload.tags);
    bank.taxonomy_category_id = payload.taxonomy_category_id;
    info!(id = %bank.id, name = %bank.name, "Creating knowledge bank");
    app_state
        .store
        .dispatch(Action::AddKnowledgeBank(bank.clone()))
        .await?;
    Ok(wrap_response(bank, debug_params, None))
}

pub async fn update_bank_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(mut bank): Json<KnowledgeBank>,
) -> Result<Json<ApiResponse<KnowledgeBank>>, AppError> {
    bank.id = id;
    app_state
        .store
        .dispatch(Action::UpdateKnowledgeBank(bank.clone()))
        .await?;
    Ok(wrap_response(bank, debug_params, None))
}

/// Removes the bank only; its scripts stay and keep their `kbId`.
pub async fn delete_bank_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    app_state
        .store
        .dispatch(Action::DeleteKnowledgeBank(id.clone()))
        .await?;
    Ok(wrap_response(id, debug_params, None))
}

// --- Scripts ---

fn matches_query(script: &Script, query: &ScriptQuery, search: Option<&str>) -> bool {
    if query.kb_id.as_ref().is_some_and(|kb| &script.kb_id != kb) {
        return false;
    }
    if query.category.as_ref().is_some_and(|c| &script.category != c) {
        return false;
    }
    if query.golden.is_some_and(|g| script.is_golden != g) {
        return false;
    }
    match search {
        Some(term) => {
            script.content.to_lowercase().contains(term)
                || script.primary_intent.to_lowercase().contains(term)
                || script.keywords.iter().any(|k| k.to_lowercase().contains(term))
        }
        None => true,
    }
}

pub async fn list_scripts_handler(
    State(app_state): State<AppState>,
    Query(query): Query<ScriptQuery>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<Script>>>, AppError> {
    let search = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let (scripts, total) = app_state
        .store
        .read(|s| {
            let matched: Vec<Script> = s
                .scripts
                .iter()
                .filter(|script| matches_query(script, &query, search.as_deref()))
                .cloned()
                .collect();
            (matched, s.scripts.len())
        })
        .await;
    let debug_info = json!({ "total": total, "matched": scripts.len() });
    Ok(wrap_response(scripts, debug_params, Some(debug_info)))
}

pub async fn update_script_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(mut script): Json<Script>,
) -> Result<Json<ApiResponse<Script>>, AppError> {
    script.id = id;
    app_state
        .store
        .dispatch(Action::UpdateScript(script.clone()))
        .await?;
    Ok(wrap_response(script, debug_params, None))
}

pub async fn delete_script_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    app_state.store.dispatch(Action::DeleteScript(id.clone())).await?;
    Ok(wrap_response(id, debug_params, None))
}

async fn find_script(app_state: &AppState, id: &str) -> Result<Script, AppError> {
    app_state
        .store
        .read(|s| s.scripts.iter().find(|script| script.id == id).cloned())
        .await
        .ok_or_else(|| AppError::NotFound(format!("Script not found: {id}")))
}

/// Flips the golden flag and returns the script as stored.
pub async fn toggle_golden_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Script>>, AppError> {
    app_state.store.dispatch(Action::ToggleGolden(id.clone())).await?;
    let script = find_script(&app_state, &id).await?;
    Ok(wrap_response(script, debug_params, None))
}

/// Asks the model for a customer question that the script answers.
pub async fn test_question_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<TextResult>>, AppError> {
    let script = find_script(&app_state, &id).await?;
    let text = authoring(&app_state)
        .await?
        .generate_test_question(&script)
        .await;
    Ok(wrap_response(TextResult { text }, debug_params, None))
}
