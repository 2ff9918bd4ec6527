//! # Ingestion
//!
//! Turns an uploaded file or pasted text into classified scripts: decode the
//! source into raw records, classify them in batches, synthesize taxonomy
//! nodes for new categories and commit everything to the store.

pub mod csv;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod pipeline;
pub mod report;
#[cfg(feature = "sheets")]
pub mod sheets;
pub mod traits;

pub use pipeline::{IngestionPipeline, IngestionReport, IngestionRequest, RunStatus};
pub use report::{
    ChannelReporter, CollectingReporter, IngestEvent, LogLevel, LogLine, ProgressReporter,
    TracingReporter,
};
pub use traits::{DecodedFile, FileKind, IngestError, IngestSource, RawRecord, RecordDecoder};

use crate::types::Language;

/// Returns the decoder for a file family, if this build supports it.
fn decoder_for(kind: FileKind) -> Result<Box<dyn RecordDecoder>, IngestError> {
    match kind {
        FileKind::Delimited => Ok(Box::new(csv::DelimitedDecoder)),
        #[cfg(feature = "sheets")]
        FileKind::Spreadsheet => Ok(Box::new(sheets::SpreadsheetDecoder)),
        #[cfg(feature = "pdf")]
        FileKind::Pdf => Ok(Box::new(pdf::PdfDecoder)),
        #[allow(unreachable_patterns)]
        other => Err(IngestError::UnsupportedFormat(format!("{other:?}"))),
    }
}

/// Decodes an uploaded file into raw records.
///
/// Fails with `UnsupportedFormat` for unknown extensions and with
/// `NoUsableData` when the file is empty or nothing survives filtering.
pub async fn decode_file(
    file_name: &str,
    bytes: &[u8],
    reporter: &dyn ProgressReporter,
) -> Result<DecodedFile, IngestError> {
    let kind = FileKind::from_file_name(file_name)?;
    if bytes.is_empty() {
        return Err(IngestError::NoUsableData);
    }

    let records = decoder_for(kind)?.decode(bytes, reporter).await?;
    if records.is_empty() {
        return Err(IngestError::NoUsableData);
    }
    Ok(DecodedFile { kind, records })
}

/// Wraps pasted text as a single record.
pub fn decode_text(text: &str, language: Language) -> Result<Vec<RawRecord>, IngestError> {
    if text.trim().is_empty() {
        return Err(IngestError::NoUsableData);
    }
    let title = match language {
        Language::Tr => "Manuel Giriş",
        Language::En => "Manual Entry",
    };
    Ok(vec![RawRecord {
        title: title.to_string(),
        content: text.to_string(),
        provided_category: None,
    }])
}
