//! # Delimited Text Decoder
//!
//! Decodes `.csv` and `.txt` uploads. The first line is treated as a header
//! when any of its cells names a known column (Turkish or English); otherwise
//! every line is data.

use crate::ingest::{
    report::ProgressReporter,
    traits::{IngestError, RawRecord, RecordDecoder},
};
use async_trait::async_trait;
use tracing::debug;

const CATEGORY_HEADERS: &[&str] = &["kategori", "category", "sinif"];
const TITLE_HEADERS: &[&str] = &["baslik", "title"];
const CONTENT_HEADERS: &[&str] = &["icerik", "content"];

/// Splits one CSV line on commas outside double quotes.
///
/// A `"` toggles quoting and is dropped. There is no escaped-quote support,
/// so `""` simply toggles twice. Every field is trimmed.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

// Folds Turkish letters onto ASCII so "BAŞLIK", "Başlık" and "baslik" all match.
fn fold_header(cell: &str) -> String {
    cell.chars()
        .map(|c| match c {
            'İ' | 'I' | 'ı' => 'i',
            'Ş' | 'ş' => 's',
            'Ç' | 'ç' => 'c',
            'Ğ' | 'ğ' => 'g',
            'Ö' | 'ö' => 'o',
            'Ü' | 'ü' => 'u',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct ColumnMap {
    category: Option<usize>,
    title: Option<usize>,
    content: Option<usize>,
}

impl ColumnMap {
    fn detect(header: &[String]) -> Self {
        let folded: Vec<String> = header.iter().map(|h| fold_header(h)).collect();
        let find = |keys: &[&str]| {
            folded
                .iter()
                .position(|cell| keys.iter().any(|k| cell.contains(k)))
        };
        Self {
            category: find(CATEGORY_HEADERS),
            title: find(TITLE_HEADERS),
            content: find(CONTENT_HEADERS),
        }
    }

    fn is_header(&self) -> bool {
        self.category.is_some() || self.title.is_some() || self.content.is_some()
    }

    fn to_record(self, parts: &[String]) -> RawRecord {
        let cell = |idx: usize| parts.get(idx).cloned().unwrap_or_default();
        let non_empty = |idx: usize| parts.get(idx).filter(|p| !p.is_empty()).cloned();

        let title = match self.title {
            Some(idx) => cell(idx),
            None => cell(0),
        };
        let content = match self.content {
            Some(idx) => cell(idx),
            None => non_empty(1).or_else(|| non_empty(0)).unwrap_or_default(),
        };
        let provided_category = self.category.and_then(non_empty);

        RawRecord {
            title,
            content,
            provided_category,
        }
    }
}

/// Decodes delimited text into records, dropping blank lines and records
/// whose content is blank.
pub fn decode_delimited(text: &str) -> Vec<RawRecord> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return Vec::new();
    };

    let columns = ColumnMap::detect(&split_csv_line(first));
    let data_lines = if columns.is_header() {
        debug!(?columns, "Detected a header row.");
        &lines[1..]
    } else {
        &lines[..]
    };

    data_lines
        .iter()
        .map(|line| columns.to_record(&split_csv_line(line)))
        .filter(|r| !r.content.trim().is_empty())
        .collect()
}

/// The `RecordDecoder` for `.csv` and `.txt` uploads.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedDecoder;

#[async_trait]
impl RecordDecoder for DelimitedDecoder {
    async fn decode(
        &self,
        bytes: &[u8],
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<RawRecord>, IngestError> {
        let text = String::from_utf8_lossy(bytes);
        let records = decode_delimited(&text);
        reporter.progress(30);
        Ok(records)
    }
}
