//! # PDF Decoder
//!
//! Extracts the text of every page, then splits it into paragraph chunks.
//! Parsing is CPU-bound, so it runs on the blocking thread pool and reports
//! each finished page back over a channel.

use crate::ingest::{
    report::{extraction_progress, ProgressReporter},
    traits::{IngestError, RawRecord, RecordDecoder},
};
use async_trait::async_trait;
use pdf::{content::Op, file::FileOptions};
use regex::Regex;
use tracing::{info, warn};

/// Chunks whose trimmed text is shorter than this are discarded.
pub const MIN_CHUNK_CHARS: usize = 20;
const TITLE_CHARS: usize = 50;
pub const PDF_CATEGORY_HINT: &str = "PDF Import";

/// Extracts the text of each page, one `String` per page.
///
/// `on_page` is called with `(pages_done, total_pages)` after every page.
fn extract_pages(
    data: &[u8],
    mut on_page: impl FnMut(usize, usize),
) -> Result<Vec<String>, IngestError> {
    let file = FileOptions::cached()
        .load(data)
        .map_err(|e| IngestError::Parse(e.to_string()))?;
    let resolver = file.resolver();
    let total = file.num_pages() as usize;
    let mut pages = Vec::new();

    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| IngestError::Parse(e.to_string()))?;

        let mut parts: Vec<String> = Vec::new();
        if let Some(content) = &page.contents {
            let operations = content
                .operations(&resolver)
                .map_err(|e| IngestError::Parse(e.to_string()))?;
            for op in operations.iter() {
                match op {
                    Op::TextDraw { text } => parts.push(text.to_string_lossy()),
                    Op::TextDrawAdjusted { array } => {
                        let run: String = array
                            .iter()
                            .filter_map(|item| match item {
                                pdf::content::TextDrawAdjusted::Text(text) => {
                                    Some(text.to_string_lossy())
                                }
                                _ => None,
                            })
                            .collect();
                        parts.push(run);
                    }
                    Op::TextNewline | Op::EndText => parts.push("\n".to_string()),
                    _ => {}
                }
            }
        } else {
            warn!("Page {} has no content stream.", page_num);
        }
        pages.push(join_text_runs(&parts));
        on_page(pages.len(), total);
    }
    Ok(pages)
}

// Text runs are joined with a space; line breaks are kept as-is.
fn join_text_runs(parts: &[String]) -> String {
    let mut text = String::new();
    for part in parts {
        if part != "\n" && !text.is_empty() && !text.ends_with('\n') {
            text.push(' ');
        }
        text.push_str(part);
    }
    text
}

/// Splits extracted page text into paragraph records.
///
/// Pages are joined by newlines and split on blank-line boundaries; chunks
/// shorter than `MIN_CHUNK_CHARS` after trimming are dropped.
pub fn chunk_pages(pages: &[String]) -> Vec<RawRecord> {
    let full_text = pages.join("\n");
    // The pattern is a constant; it cannot fail to compile.
    let Ok(boundary) = Regex::new(r"\n\s*\n") else {
        return Vec::new();
    };

    boundary
        .split(&full_text)
        .map(str::trim)
        .filter(|chunk| chunk.chars().count() >= MIN_CHUNK_CHARS)
        .map(|chunk| RawRecord {
            title: format!("{}...", chunk.chars().take(TITLE_CHARS).collect::<String>()),
            content: chunk.to_string(),
            provided_category: Some(PDF_CATEGORY_HINT.to_string()),
        })
        .collect()
}

/// The `RecordDecoder` for `.pdf` uploads.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfDecoder;

#[async_trait]
impl RecordDecoder for PdfDecoder {
    async fn decode(
        &self,
        bytes: &[u8],
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<RawRecord>, IngestError> {
        info!("Extracting text from PDF...");
        reporter.progress(0);

        let data = bytes.to_vec();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let extraction = tokio::task::spawn_blocking(move || {
            extract_pages(&data[..], |done, total| {
                // The receiver only goes away if the decode future was dropped.
                let _ = tx.send((done, total));
            })
        });

        while let Some((done, total)) = rx.recv().await {
            reporter.progress(extraction_progress(done, total));
        }

        let pages = extraction.await.map_err(|e| {
            IngestError::Internal(anyhow::anyhow!("Tokio join error during PDF parsing: {e}"))
        })??;
        info!("Extracted {} page(s) from PDF.", pages.len());

        Ok(chunk_pages(&pages))
    }
}
