//! # General Route Handlers
//!
//! Liveness, dashboard stats, the settings screen and the factory reset.

use super::{authoring, current_settings, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::ConnectionStatus;
use anybot::{
    store::SettingsUpdate,
    types::Settings,
    Action, DashboardStats,
};
use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::json;
use tracing::info;

/// The handler for the root (`/`) endpoint.
pub async fn root() -> &'static str {
    "anybot admin console is running."
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn stats_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<DashboardStats>>, AppError> {
    let stats = app_state.store.read(DashboardStats::compute).await;
    Ok(wrap_response(stats, debug_params, None))
}

pub async fn get_settings_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Settings>>, AppError> {
    let settings = current_settings(&app_state).await;
    let debug_info = json!({ "default_provider": app_state.config.default_provider });
    Ok(wrap_response(settings, debug_params, Some(debug_info)))
}

/// Applies a partial settings change. Out-of-range values are rejected
/// with 400 and nothing is changed.
pub async fn update_settings_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<ApiResponse<Settings>>, AppError> {
    info!(?update, "Updating settings");
    app_state.store.dispatch(Action::UpdateSettings(update)).await?;
    let settings = current_settings(&app_state).await;
    Ok(wrap_response(settings, debug_params, None))
}

/// Sends a trivial request to the active model.
pub async fn verify_connection_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<ConnectionStatus>>, AppError> {
    let model = current_settings(&app_state).await.active_model;
    let connected = authoring(&app_state).await?.verify_connection().await;
    info!(%model, connected, "Connection check finished.");
    Ok(wrap_response(
        ConnectionStatus { connected, model },
        debug_params,
        None,
    ))
}

/// Clears every collection and restores the default settings.
pub async fn reset_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Settings>>, AppError> {
    info!("Resetting all console data.");
    app_state.store.dispatch(Action::Reset).await?;
    let settings = current_settings(&app_state).await;
    Ok(wrap_response(settings, debug_params, None))
}
