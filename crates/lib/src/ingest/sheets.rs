//! # Spreadsheet Decoder
//!
//! Decodes `.xlsx` / `.xls` uploads with `calamine`. Only the first sheet is
//! read; its first row names the columns.

use crate::ingest::{
    report::ProgressReporter,
    traits::{IngestError, RawRecord, RecordDecoder},
};
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;

const TITLE_COLUMNS: &[&str] = &["Başlık", "Title", "title", "baslik"];
const CONTENT_COLUMNS: &[&str] = &["İçerik", "Content", "content", "icerik"];
const CATEGORY_COLUMNS: &[&str] = &["Kategori", "Category", "category", "kategori"];

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        other => {
            let text = other.to_string();
            (!text.trim().is_empty()).then_some(text)
        }
    }
}

/// Maps header rows and data rows into records.
///
/// Kept separate from the workbook reader so the mapping can be exercised
/// without building a binary spreadsheet.
pub fn rows_to_records(header: &[String], rows: &[Vec<Option<String>>]) -> Vec<RawRecord> {
    rows.iter()
        .filter_map(|row| {
            // Cells in header order, skipping empty ones, like a row object.
            let cells: Vec<(&str, &str)> = header
                .iter()
                .zip(row.iter())
                .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
                .collect();
            let by_name: HashMap<&str, &str> = cells.iter().copied().collect();
            let pick = |aliases: &[&str]| {
                aliases
                    .iter()
                    .find_map(|alias| by_name.get(alias).map(|v| v.to_string()))
            };

            let content = pick(CONTENT_COLUMNS).unwrap_or_else(|| {
                cells
                    .iter()
                    .map(|(_, v)| *v)
                    .collect::<Vec<_>>()
                    .join(" ")
            });
            if content.trim().is_empty() {
                return None;
            }

            Some(RawRecord {
                title: pick(TITLE_COLUMNS).unwrap_or_default(),
                content,
                provided_category: pick(CATEGORY_COLUMNS),
            })
        })
        .collect()
}

fn read_first_sheet(bytes: &[u8]) -> Result<Vec<RawRecord>, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Parse(e.to_string()))?;

    let Some(range) = workbook.worksheet_range_at(0) else {
        return Ok(Vec::new());
    };
    let range = range.map_err(|e| IngestError::Parse(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header_row
        .iter()
        .map(|c| cell_text(c).unwrap_or_default())
        .collect();
    debug!(?header, "Read spreadsheet header.");

    let data: Vec<Vec<Option<String>>> = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(rows_to_records(&header, &data))
}

/// The `RecordDecoder` for spreadsheet uploads.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetDecoder;

#[async_trait]
impl RecordDecoder for SpreadsheetDecoder {
    async fn decode(
        &self,
        bytes: &[u8],
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<RawRecord>, IngestError> {
        let data = bytes.to_vec();
        let records = tokio::task::spawn_blocking(move || read_first_sheet(&data))
            .await
            .map_err(|e| {
                IngestError::Internal(anyhow::anyhow!(
                    "Tokio join error during spreadsheet parsing: {e}"
                ))
            })??;
        reporter.progress(30);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn aliases_are_tried_in_order() {
        let header = vec!["Title".to_string(), "icerik".to_string(), "Kategori".to_string()];
        let rows = vec![vec![s("Refunds"), s("Within 14 days."), s("Billing")]];
        let records = rows_to_records(&header, &rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Refunds");
        assert_eq!(records[0].content, "Within 14 days.");
        assert_eq!(records[0].provided_category.as_deref(), Some("Billing"));
    }

    #[test]
    fn content_falls_back_to_all_cells() {
        let header = vec!["Question".to_string(), "Answer".to_string()];
        let rows = vec![
            vec![s("Where?"), s("Here.")],
            vec![None, None],
            vec![None, s("Only answer")],
        ];
        let records = rows_to_records(&header, &rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "Where? Here.");
        assert_eq!(records[0].title, "");
        assert_eq!(records[1].content, "Only answer");
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let result = read_first_sheet(b"definitely not a workbook");
        assert!(matches!(result, Err(IngestError::Parse(_))));
    }
}
