use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::general::root))
        .route("/health", get(handlers::general::health_check))
        .route("/stats", get(handlers::general::stats_handler))
        .route(
            "/settings",
            get(handlers::general::get_settings_handler).put(handlers::general::update_settings_handler),
        )
        .route("/settings/verify", post(handlers::general::verify_connection_handler))
        .route("/reset", post(handlers::general::reset_handler))
        // Knowledge banks and scripts
        .route(
            "/knowledge-banks",
            get(handlers::knowledge::list_banks_handler).post(handlers::knowledge::create_bank_handler),
        )
        .route(
            "/knowledge-banks/{id}",
            put(handlers::knowledge::update_bank_handler).delete(handlers::knowledge::delete_bank_handler),
        )
        .route("/scripts", get(handlers::knowledge::list_scripts_handler))
        .route(
            "/scripts/{id}",
            put(handlers::knowledge::update_script_handler).delete(handlers::knowledge::delete_script_handler),
        )
        .route("/scripts/{id}/golden", post(handlers::knowledge::toggle_golden_handler))
        .route(
            "/scripts/{id}/test-question",
            post(handlers::knowledge::test_question_handler),
        )
        // Taxonomy
        .route(
            "/taxonomy",
            get(handlers::taxonomy::list_categories_handler).post(handlers::taxonomy::create_category_handler),
        )
        .route("/taxonomy/bulk", post(handlers::taxonomy::bulk_import_handler))
        .route(
            "/taxonomy/{id}",
            put(handlers::taxonomy::update_category_handler).delete(handlers::taxonomy::delete_category_handler),
        )
        .route(
            "/taxonomy/{id}/scripts",
            get(handlers::taxonomy::category_scripts_handler).post(handlers::taxonomy::add_scripts_handler),
        )
        .route("/taxonomy/{id}/context", post(handlers::taxonomy::category_context_handler))
        // Ingestion
        .route("/ingest/text", post(handlers::ingest::ingest_text_handler))
        .route(
            "/ingest/file",
            post(handlers::ingest::ingest_file_handler).layer(DefaultBodyLimit::max(10 * 1024 * 1024)),
        )
        // Playground
        .route("/chat", post(handlers::chat::chat_handler))
        .route("/logs", get(handlers::chat::list_logs_handler))
        .route("/logs/{id}/correct", post(handlers::chat::correct_log_handler))
        // Bots and escalation rules
        .route(
            "/bots",
            get(handlers::bots::list_bots_handler).post(handlers::bots::create_bot_handler),
        )
        .route("/bots/prompt", post(handlers::bots::generate_prompt_handler))
        .route(
            "/bots/{id}",
            put(handlers::bots::update_bot_handler).delete(handlers::bots::delete_bot_handler),
        )
        .route(
            "/rules",
            get(handlers::rules::list_rules_handler).post(handlers::rules::create_rule_handler),
        )
        .route(
            "/rules/{id}",
            put(handlers::rules::update_rule_handler).delete(handlers::rules::delete_rule_handler),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
