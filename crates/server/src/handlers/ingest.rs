//! # Ingestion Handlers
//!
//! Both endpoints run a whole ingestion before answering and return the run
//! report together with the log lines the console would have streamed.

use super::{current_settings, wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::{IngestResponse, IngestTextRequest};
use anybot::{
    ingest::CollectingReporter, BatchClassifier, IngestSource, IngestionPipeline,
    IngestionRequest,
};
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::Multipart;
use serde_json::json;
use std::time::Duration;
use tracing::info;

async fn run_ingestion(
    app_state: &AppState,
    request: IngestionRequest,
) -> Result<IngestResponse, AppError> {
    let bank_exists = app_state
        .store
        .read(|s| s.knowledge_bank(&request.kb_id).is_some())
        .await;
    if !bank_exists {
        return Err(AppError::NotFound(format!(
            "Knowledge bank not found: {}",
            request.kb_id
        )));
    }

    let settings = current_settings(app_state).await;
    let classifier = BatchClassifier::new(app_state.active_provider().await?, settings.language)
        .with_sampling(settings.temperature, settings.top_p);
    let ingestion = &app_state.config.ingestion;
    let pipeline = IngestionPipeline::new(classifier, app_state.store.clone()).with_batching(
        ingestion.batch_size,
        Duration::from_millis(ingestion.batch_delay_ms),
    );

    let reporter = CollectingReporter::new();
    let report = pipeline.run(request, &reporter).await;
    Ok(IngestResponse {
        report,
        logs: reporter.lines(),
    })
}

/// Ingests pasted text as a single record.
pub async fn ingest_text_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<IngestTextRequest>,
) -> Result<Json<ApiResponse<IngestResponse>>, AppError> {
    info!(kb_id = %payload.kb_id, "Received manual text ingestion request.");
    let request = IngestionRequest {
        source: IngestSource::Text(payload.text),
        kb_id: payload.kb_id,
        root_category_id: payload.root_category_id,
    };
    let response = run_ingestion(&app_state, request).await?;
    Ok(wrap_response(response, debug_params, None))
}

/// Ingests an uploaded CSV, TXT, XLSX, XLS or PDF file.
///
/// Multipart fields: `file` (required), `kbId` (required) and
/// `rootCategoryId` (optional).
pub async fn ingest_file_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<IngestResponse>>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut kb_id: Option<String> = None;
    let mut root_category_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field.bytes().await?.to_vec();
                info!("Received file '{}' ({} bytes).", file_name, bytes.len());
                file = Some((file_name, bytes));
            }
            "kbId" => kb_id = Some(field.text().await?),
            "rootCategoryId" => {
                let value = field.text().await?;
                root_category_id = Some(value).filter(|v| !v.trim().is_empty());
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("File data not found in request.".to_string()))?;
    let kb_id = kb_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("A kbId field is required.".to_string()))?;

    let request = IngestionRequest {
        source: IngestSource::File {
            file_name: file_name.clone(),
            bytes,
        },
        kb_id,
        root_category_id,
    };
    let response = run_ingestion(&app_state, request).await?;
    let debug_info = json!({ "file_name": file_name });
    Ok(wrap_response(response, debug_params, Some(debug_info)))
}
