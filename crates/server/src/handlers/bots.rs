//! # Bot Handlers

use super::{authoring, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::{BotPromptRequest, CreateBotRequest, TextResult};
use anybot::{types::Bot, Action};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::info;

pub async fn list_bots_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<Bot>>>, AppError> {
    let bots = app_state.store.read(|s| s.bots.clone()).await;
    Ok(wrap_response(bots, debug_params, None))
}

pub async fn create_bot_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateBotRequest>,
) -> Result<Json<ApiResponse<Bot>>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Bot name must not be blank.".to_string()));
    }
    let mut bot = Bot::new(&payload.name, &payload.role, payload.kb_ids);
    bot.system_prompt = payload.system_prompt.filter(|p| !p.trim().is_empty());
    if let Some(tone) = payload.tone {
        bot.tone = tone;
    }
    if let Some(temperature) = payload.temperature {
        bot.temperature = temperature;
    }
    info!(id = %bot.id, name = %bot.name, "Creating bot");
    app_state.store.dispatch(Action::AddBot(bot.clone())).await?;
    Ok(wrap_response(bot, debug_params, None))
}

pub async fn update_bot_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(mut bot): Json<Bot>,
) -> Result<Json<ApiResponse<Bot>>, AppError> {
    bot.id = id;
    app_state.store.dispatch(Action::UpdateBot(bot.clone())).await?;
    Ok(wrap_response(bot, debug_params, None))
}

pub async fn delete_bot_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    app_state.store.dispatch(Action::DeleteBot(id.clone())).await?;
    Ok(wrap_response(id, debug_params, None))
}

/// Drafts a system prompt from a bot's name, role and tone.
pub async fn generate_prompt_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<BotPromptRequest>,
) -> Result<Json<ApiResponse<TextResult>>, AppError> {
    let text = authoring(&app_state)
        .await?
        .generate_bot_prompt(&payload.name, &payload.role, payload.tone)
        .await;
    Ok(wrap_response(TextResult { text }, debug_params, None))
}
