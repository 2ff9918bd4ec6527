use crate::{errors::PromptError, ingest::report::ProgressReporter, store::StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The error type for every stage of an ingestion run.
///
/// Decoders map their parser errors into `Parse`; the pipeline catches any of
/// these at the top of a run and reports it as a failed run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("No usable data was found in the source.")]
    NoUsableData,

    #[error("Classification request failed: {0}")]
    ClassifierRequestFailed(#[from] PromptError),

    #[error("Knowledge bank not found: {0}")]
    UnknownKnowledgeBank(String),

    #[error("Failed to parse the content from the source: {0}")]
    Parse(String),

    #[error("Failed to persist ingestion results: {0}")]
    Store(#[from] StoreError),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

/// One unit of text pulled out of a source, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_category: Option<String>,
}

/// The family of decoder selected by a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Delimited,
    Spreadsheet,
    Pdf,
}

impl FileKind {
    /// Picks the decoder family from a file name, ignoring extension case.
    pub fn from_file_name(file_name: &str) -> Result<Self, IngestError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" | "txt" => Ok(FileKind::Delimited),
            "xlsx" | "xls" => Ok(FileKind::Spreadsheet),
            "pdf" => Ok(FileKind::Pdf),
            _ => Err(IngestError::UnsupportedFormat(extension)),
        }
    }
}

/// The records extracted from one uploaded file.
#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub kind: FileKind,
    pub records: Vec<RawRecord>,
}

/// What an ingestion run reads from.
#[derive(Debug, Clone)]
pub enum IngestSource {
    File { file_name: String, bytes: Vec<u8> },
    Text(String),
}

impl IngestSource {
    /// A short label for log lines.
    pub fn label(&self) -> &str {
        match self {
            IngestSource::File { file_name, .. } => file_name,
            IngestSource::Text(_) => "manual text",
        }
    }
}

/// A decoder for one file family.
///
/// Decoders only extract records; empty results are turned into
/// `NoUsableData` by the caller so every decoder agrees on that rule.
#[async_trait]
pub trait RecordDecoder: Send + Sync {
    async fn decode(
        &self,
        bytes: &[u8],
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<RawRecord>, IngestError>;
}
