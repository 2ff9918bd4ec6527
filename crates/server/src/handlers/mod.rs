//! # API Route Handlers
//!
//! The Axum handlers behind the admin console, split by screen: general
//! settings and stats, knowledge banks and scripts, the taxonomy, ingestion,
//! the chat playground, bots and escalation rules.

pub mod bots;
pub mod chat;
pub mod general;
pub mod ingest;
pub mod knowledge;
pub mod rules;
pub mod taxonomy;

use super::{
    errors::AppError,
    state::AppState,
    types::{ApiResponse, DebugParams},
};
use anybot::{types::Settings, Authoring};
use axum::{extract::Query, Json};
use serde_json::Value;

/// A shared helper function to wrap a successful result in the standard `ApiResponse`
/// format, optionally including debug information if requested.
pub(crate) fn wrap_response<T>(
    result: T,
    debug_params: Query<DebugParams>,
    debug_info: Option<Value>,
) -> Json<ApiResponse<T>> {
    let debug = if debug_params.debug.unwrap_or(false) {
        debug_info
    } else {
        None
    };
    Json(ApiResponse { debug, result })
}

pub(crate) async fn current_settings(app_state: &AppState) -> Settings {
    app_state.store.read(|s| s.settings.clone()).await
}

/// Authoring helpers bound to the active model and the console language.
pub(crate) async fn authoring(app_state: &AppState) -> Result<Authoring, AppError> {
    let provider = app_state.active_provider().await?;
    let settings = current_settings(app_state).await;
    Ok(Authoring::new(provider, settings.language))
}
