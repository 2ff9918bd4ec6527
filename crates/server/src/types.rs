//! Request payloads and the response envelope shared by every handler.

use anybot::{ingest::LogLine, types::Tone, IngestionReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
pub struct DebugParams {
    pub debug: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    pub result: T,
}

// --- Knowledge banks and scripts ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKnowledgeBankRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub taxonomy_category_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScriptQuery {
    pub kb_id: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub golden: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextResult {
    pub text: String,
}

// --- Taxonomy ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub kb_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportRequest {
    #[serde(default)]
    pub parent_id: Option<String>,
    pub lines: String,
    #[serde(default)]
    pub kb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddScriptsRequest {
    pub text: String,
}

// --- Ingestion ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestTextRequest {
    pub text: String,
    pub kb_id: String,
    #[serde(default)]
    pub root_category_id: Option<String>,
}

/// The run report plus every log line the run produced.
#[derive(Serialize)]
pub struct IngestResponse {
    pub report: IngestionReport,
    pub logs: Vec<LogLine>,
}

// --- Chat and logs ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LogQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub corrected_response: String,
    #[serde(default)]
    pub bot_id: Option<String>,
}

// --- Bots ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBotRequest {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub kb_ids: Vec<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct BotPromptRequest {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub tone: Tone,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub model: String,
}
