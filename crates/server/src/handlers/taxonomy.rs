//! # Taxonomy Handlers
//!
//! Browsing and editing the category tree, plus the two AI helpers of the
//! category editor: analyzing pasted text into scripts and drafting a prompt
//! context from a category's scripts.

use super::{authoring, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::{AddScriptsRequest, BulkImportRequest, CreateCategoryRequest, TextResult};
use anybot::{
    taxonomy::{self, CategoryFilter, CategoryUpdate},
    types::{new_id, Script, TaxonomyCategory},
    Action,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyQuery {
    /// Limits the listing to one group and its descendants.
    pub group_id: Option<String>,
    pub kb_id: Option<String>,
    pub search: Option<String>,
}

pub async fn list_categories_handler(
    State(app_state): State<AppState>,
    Query(query): Query<TaxonomyQuery>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<TaxonomyCategory>>>, AppError> {
    let categories = app_state
        .store
        .read(|s| match query.group_id {
            Some(group_id) => {
                let filter = CategoryFilter {
                    group_id,
                    kb_id: query.kb_id,
                    search: query.search,
                };
                taxonomy::filter(&s.taxonomy, &filter)
                    .into_iter()
                    .cloned()
                    .collect()
            }
            None => s.taxonomy.clone(),
        })
        .await;
    Ok(wrap_response(categories, debug_params, None))
}

pub async fn create_category_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<ApiResponse<TaxonomyCategory>>, AppError> {
    let mut category = TaxonomyCategory::new(new_id("CAT"), &payload.name, payload.parent_id);
    category.kb_id = payload.kb_id;
    category.description = payload.description;
    info!(id = %category.id, name = %category.name, "Creating category");
    app_state
        .store
        .dispatch(Action::AddCategory(category.clone()))
        .await?;
    Ok(wrap_response(category, debug_params, None))
}

/// Adds one category per line; names already under the parent are skipped.
/// Returns only the categories that were created.
pub async fn bulk_import_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<BulkImportRequest>,
) -> Result<Json<ApiResponse<Vec<TaxonomyCategory>>>, AppError> {
    let before: HashSet<String> = app_state
        .store
        .read(|s| s.taxonomy.iter().map(|c| c.id.clone()).collect())
        .await;
    app_state
        .store
        .dispatch(Action::BulkImportCategories {
            parent_id: payload.parent_id,
            lines: payload.lines,
            kb_id: payload.kb_id,
        })
        .await?;
    let created: Vec<TaxonomyCategory> = app_state
        .store
        .read(|s| {
            s.taxonomy
                .iter()
                .filter(|c| !before.contains(&c.id))
                .cloned()
                .collect()
        })
        .await;
    info!("Bulk import created {} categories.", created.len());
    Ok(wrap_response(created, debug_params, None))
}

async fn find_category(app_state: &AppState, id: &str) -> Result<TaxonomyCategory, AppError> {
    app_state
        .store
        .read(|s| s.category(id).cloned())
        .await
        .ok_or_else(|| AppError::NotFound(format!("Category not found: {id}")))
}

pub async fn update_category_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(update): Json<CategoryUpdate>,
) -> Result<Json<ApiResponse<TaxonomyCategory>>, AppError> {
    app_state
        .store
        .dispatch(Action::UpdateCategory {
            id: id.clone(),
            update,
        })
        .await?;
    let category = find_category(&app_state, &id).await?;
    Ok(wrap_response(category, debug_params, None))
}

/// Removes the category and everything below it.
pub async fn delete_category_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let mut removed = vec![id.clone()];
    removed.extend(
        app_state
            .store
            .read(|s| taxonomy::descendants(&s.taxonomy, &id))
            .await,
    );
    app_state.store.dispatch(Action::RemoveCategory(id)).await?;
    Ok(wrap_response(removed, debug_params, None))
}

pub async fn category_scripts_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<Script>>>, AppError> {
    let scripts = app_state
        .store
        .read(|s| {
            taxonomy::associated_scripts(&s.taxonomy, &s.scripts, &id)
                .map(|found| found.into_iter().cloned().collect::<Vec<_>>())
        })
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;
    Ok(wrap_response(scripts, debug_params, None))
}

/// Analyzes each usable line of the pasted text into a script filed under
/// the category.
pub async fn add_scripts_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<AddScriptsRequest>,
) -> Result<Json<ApiResponse<Vec<Script>>>, AppError> {
    find_category(&app_state, &id).await?;
    let scripts = authoring(&app_state)
        .await?
        .analyze_and_add_scripts(&app_state.store, &id, &payload.text)
        .await?;
    let debug_info = json!({ "category_id": id, "added": scripts.len() });
    Ok(wrap_response(scripts, debug_params, Some(debug_info)))
}

/// Drafts a prompt context from the category's scripts. The draft is not
/// saved; the editor stores it through the regular update.
pub async fn category_context_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<TextResult>>, AppError> {
    let category = find_category(&app_state, &id).await?;
    let scripts: Vec<Script> = app_state
        .store
        .read(|s| {
            s.scripts
                .iter()
                .filter(|script| script.category == category.name)
                .cloned()
                .collect()
        })
        .await;
    let text = authoring(&app_state)
        .await?
        .generate_category_context(&category.name, &scripts)
        .await;
    Ok(wrap_response(TextResult { text }, debug_params, None))
}
