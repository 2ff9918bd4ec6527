//! # Spreadsheet Decoding Tests
//!
//! Builds real `.xlsx` workbooks in memory and decodes them end to end.

mod common;

use anybot::ingest::{decode_file, CollectingReporter, FileKind, IngestError};
use anybot_test_utils::helpers::generate_test_xlsx;
use anyhow::Result;
use common::setup_tracing;

#[tokio::test]
async fn only_the_first_sheet_becomes_records() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let faq: &[&[&str]] = &[
        &["Başlık", "İçerik", "Kategori"],
        &["Kargo", "Siparişler 3 iş gününde teslim edilir.", "Teslimat"],
        &["İade", "İade süresi 14 gündür.", ""],
        &["", "", ""],
    ];
    let archive: &[&[&str]] = &[
        &["Title", "Content"],
        &["Old", "This row lives on the second sheet."],
    ];
    let workbook = generate_test_xlsx(&[("FAQ", faq), ("Archive", archive)])?;
    let reporter = CollectingReporter::new();

    // --- Act ---
    let decoded = decode_file("destek.xlsx", &workbook, &reporter).await?;

    // --- Assert ---
    assert_eq!(decoded.kind, FileKind::Spreadsheet);
    assert_eq!(decoded.records.len(), 2);
    assert_eq!(decoded.records[0].title, "Kargo");
    assert_eq!(
        decoded.records[0].content,
        "Siparişler 3 iş gününde teslim edilir."
    );
    assert_eq!(
        decoded.records[0].provided_category.as_deref(),
        Some("Teslimat")
    );
    assert_eq!(decoded.records[1].provided_category, None);
    assert!(decoded
        .records
        .iter()
        .all(|r| !r.content.contains("second sheet")));
    assert_eq!(reporter.last_progress(), 30);
    Ok(())
}

#[tokio::test]
async fn english_and_lowercase_headers_are_recognized() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let rows: &[&[&str]] = &[
        &["title", "content", "category"],
        &["Refunds", "Refunds take five business days.", "Billing"],
    ];
    let workbook = generate_test_xlsx(&[("Sheet1", rows)])?;

    // --- Act ---
    let decoded = decode_file("faq.xlsx", &workbook, &CollectingReporter::new()).await?;

    // --- Assert ---
    assert_eq!(decoded.records.len(), 1);
    assert_eq!(decoded.records[0].title, "Refunds");
    assert_eq!(decoded.records[0].content, "Refunds take five business days.");
    assert_eq!(decoded.records[0].provided_category.as_deref(), Some("Billing"));
    Ok(())
}

#[tokio::test]
async fn unknown_headers_join_every_cell_into_content() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let rows: &[&[&str]] = &[
        &["Soru", "Question"],
        &["Kargo ne zaman gelir?", "When does shipping arrive?"],
    ];
    let workbook = generate_test_xlsx(&[("Sorular", rows)])?;

    // --- Act ---
    let decoded = decode_file("sorular.xlsx", &workbook, &CollectingReporter::new()).await?;

    // --- Assert ---
    assert_eq!(decoded.records.len(), 1);
    assert_eq!(
        decoded.records[0].content,
        "Kargo ne zaman gelir? When does shipping arrive?"
    );
    assert_eq!(decoded.records[0].title, "");
    Ok(())
}

#[tokio::test]
async fn header_only_workbook_has_no_usable_data() -> Result<()> {
    setup_tracing();
    let rows: &[&[&str]] = &[&["Başlık", "İçerik"]];
    let workbook = generate_test_xlsx(&[("Boş", rows)])?;

    let result = decode_file("bos.xlsx", &workbook, &CollectingReporter::new()).await;

    assert!(matches!(result, Err(IngestError::NoUsableData)));
    Ok(())
}
