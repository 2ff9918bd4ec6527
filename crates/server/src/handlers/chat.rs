//! # Playground Handlers

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::{ChatRequest, CorrectionRequest, LogQuery};
use anybot::{
    correct_response,
    types::{AgentLog, LogStatus},
    ChatSession, ChatTurn,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

/// Sends one playground message. A failing model degrades to an apology
/// with `degraded: true` instead of an error status.
pub async fn chat_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatTurn>>, AppError> {
    let provider = app_state.active_provider().await?;
    let session = ChatSession::new(app_state.store.clone(), provider, payload.bot_id.clone());
    let turn = session.send(&payload.message).await?;
    let debug_info = json!({ "bot_id": payload.bot_id });
    Ok(wrap_response(turn, debug_params, Some(debug_info)))
}

fn parse_status(raw: &str) -> Result<LogStatus, AppError> {
    serde_json::from_value(Value::String(raw.trim().to_uppercase()))
        .map_err(|_| AppError::BadRequest(format!("Unknown log status: '{raw}'")))
}

/// Lists agent logs, newest first.
pub async fn list_logs_handler(
    State(app_state): State<AppState>,
    Query(query): Query<LogQuery>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<AgentLog>>>, AppError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let logs: Vec<AgentLog> = app_state
        .store
        .read(|s| {
            s.agent_logs
                .iter()
                .filter(|log| status.map_or(true, |wanted| log.status == wanted))
                .take(query.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect()
        })
        .await;
    Ok(wrap_response(logs, debug_params, None))
}

/// Replaces a log's reply with the operator's correction and stores the
/// pair as a golden script.
pub async fn correct_log_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CorrectionRequest>,
) -> Result<Json<ApiResponse<AgentLog>>, AppError> {
    if payload.corrected_response.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Corrected response must not be blank.".to_string(),
        ));
    }
    let (log, bot) = app_state
        .store
        .read(|s| {
            let bot = payload.bot_id.as_deref().and_then(|b| s.bot(b)).cloned();
            (s.agent_log(&id).cloned(), bot)
        })
        .await;
    let log = log.ok_or_else(|| AppError::NotFound(format!("Agent log not found: {id}")))?;

    let action = correct_response(&log, payload.corrected_response.trim(), bot.as_ref());
    app_state.store.dispatch(action).await?;
    info!(log_id = %id, "Agent log corrected.");

    let corrected = app_state
        .store
        .read(|s| s.agent_log(&id).cloned())
        .await
        .ok_or_else(|| AppError::NotFound(format!("Agent log not found: {id}")))?;
    Ok(wrap_response(corrected, debug_params, None))
}
