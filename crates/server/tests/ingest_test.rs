//! # Ingestion Endpoint Tests
//!
//! Uploads files and pasted text through the HTTP API and checks the run
//! report, the returned log lines and what landed in the store.

mod common;

use anybot_test_utils::{classification_json, TURKISH_CSV, TWO_ROW_CSV};
use anyhow::Result;
use common::{TestApp, CLASSIFIER_KEY};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

fn csv_form(file_name: &str, body: &str, kb_id: &str) -> Result<Form> {
    let part = Part::bytes(body.as_bytes().to_vec())
        .file_name(file_name.to_string())
        .mime_str("text/csv")?;
    Ok(Form::new().part("file", part).text("kbId", kb_id.to_string()))
}

async fn upload(app: &TestApp, form: Form) -> Result<(u16, Value)> {
    let response = app
        .client
        .post(app.url("/ingest/file"))
        .multipart(form)
        .send()
        .await?;
    let status = response.status().as_u16();
    Ok((status, response.json().await?))
}

#[tokio::test]
async fn test_csv_upload_creates_scripts_and_categories() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let kb_id = app.create_bank("FAQ").await?;
    app.provider
        .add_response(CLASSIFIER_KEY, &classification_json(2, "Greetings"));

    // --- Act ---
    let (status, body) = upload(&app, csv_form("faq.csv", TWO_ROW_CSV, &kb_id)?).await?;

    // --- Assert ---
    assert_eq!(status, 200, "{body}");
    let report = &body["result"]["report"];
    assert_eq!(report["status"], "COMPLETED");
    assert_eq!(report["recordsFound"], 2);
    assert_eq!(report["scriptsAdded"], 2);
    assert!(report["categoriesCreated"].as_u64().unwrap() >= 1);

    let logs = body["result"]["logs"].as_array().unwrap();
    assert!(logs
        .iter()
        .any(|l| l["level"] == "wait" && l["message"] == "Analyzing: [1-2]"));
    assert_eq!(logs.last().unwrap()["level"], "success");

    let (_, scripts) = app
        .get_json(&format!("/scripts?kbId={kb_id}"))
        .await?;
    assert_eq!(scripts["result"].as_array().unwrap().len(), 2);

    let (_, banks) = app.get_json("/knowledge-banks").await?;
    assert_eq!(banks["result"][0]["documentCount"], 2);
    Ok(())
}

#[tokio::test]
async fn test_provided_categories_are_kept() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let kb_id = app.create_bank("Destek").await?;
    app.provider
        .add_response(CLASSIFIER_KEY, &classification_json(2, "Ignored"));

    // --- Act ---
    let (_, body) = upload(&app, csv_form("destek.csv", TURKISH_CSV, &kb_id)?).await?;
    let (_, taxonomy) = app.get_json("/taxonomy").await?;

    // --- Assert ---
    assert_eq!(body["result"]["report"]["status"], "COMPLETED");
    let names: Vec<&str> = taxonomy["result"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(names.contains(&"DESTEK.CSV"));
    assert!(names.contains(&"Teslimat"));
    assert!(names.contains(&"İade"));
    assert!(!names.contains(&"Ignored"));
    Ok(())
}

#[tokio::test]
async fn test_text_ingestion_under_an_existing_group() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let kb_id = app.create_bank("Manual").await?;
    let (_, group) = app.post_json("/taxonomy", json!({ "name": "Destek" })).await?;
    let group_id = group["result"]["id"].as_str().unwrap().to_string();
    app.provider
        .add_response(CLASSIFIER_KEY, &classification_json(1, "Kargo"));

    // --- Act ---
    let (status, body) = app
        .post_json(
            "/ingest/text",
            json!({
                "text": "Kargo 3 iş gününde teslim edilir.",
                "kbId": kb_id,
                "rootCategoryId": group_id
            }),
        )
        .await?;

    // --- Assert ---
    assert_eq!(status, 200);
    let report = &body["result"]["report"];
    assert_eq!(report["status"], "COMPLETED");
    assert_eq!(report["rootCategoryId"], group_id.as_str());
    assert_eq!(report["categoriesCreated"], 1);

    let (_, children) = app
        .get_json(&format!("/taxonomy?groupId={group_id}"))
        .await?;
    let names: Vec<&str> = children["result"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Kargo"));
    Ok(())
}

#[tokio::test]
async fn test_classifier_failure_is_reported_not_raised() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let kb_id = app.create_bank("FAQ").await?;
    let (_, before) = app.get_json("/taxonomy").await?;
    app.provider.fail_with("quota exceeded");

    // --- Act ---
    let (status, body) = upload(&app, csv_form("faq.csv", TWO_ROW_CSV, &kb_id)?).await?;
    let (_, after) = app.get_json("/taxonomy").await?;

    // --- Assert ---
    assert_eq!(status, 200);
    let report = &body["result"]["report"];
    assert_eq!(report["status"], "FAILED");
    assert_eq!(report["scriptsAdded"], 0);
    assert!(report["error"].as_str().unwrap().contains("quota exceeded"));
    let logs = body["result"]["logs"].as_array().unwrap();
    assert!(logs
        .iter()
        .any(|l| l["level"] == "error" && l["message"].as_str().unwrap().starts_with("Critical error")));
    assert_eq!(after["result"], before["result"]);
    assert!(!after["result"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["name"] == "FAQ.CSV"));
    Ok(())
}

#[tokio::test]
async fn test_bad_uploads_are_rejected() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let kb_id = app.create_bank("FAQ").await?;

    // --- Act ---
    let (unknown_status, _) = upload(&app, csv_form("faq.csv", TWO_ROW_CSV, "KB-missing")?).await?;
    let (unsupported_status, unsupported) =
        upload(&app, csv_form("notes.docx", "hello", &kb_id)?).await?;
    let no_kb = Form::new().part(
        "file",
        Part::bytes(TWO_ROW_CSV.as_bytes().to_vec()).file_name("faq.csv"),
    );
    let (no_kb_status, _) = upload(&app, no_kb).await?;

    // --- Assert ---
    assert_eq!(unknown_status, 404);
    assert_eq!(unsupported_status, 200);
    assert_eq!(unsupported["result"]["report"]["status"], "FAILED");
    assert!(unsupported["result"]["report"]["error"]
        .as_str()
        .unwrap()
        .contains("docx"));
    assert_eq!(no_kb_status, 400);
    assert!(app.provider.get_calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_truncated_multipart_body_is_a_client_error() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let body = "--XBOUNDARY\r\n\
                Content-Disposition: form-data; name=\"file\"; filename=\"faq.csv\"\r\n\
                Content-Type: text/csv\r\n\r\n\
                title,content\nA,never finished";

    // --- Act ---
    let response = app
        .client
        .post(app.url("/ingest/file"))
        .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
        .body(body)
        .send()
        .await?;
    let status = response.status().as_u16();
    let payload: Value = response.json().await?;

    // --- Assert ---
    assert_eq!(status, 400, "{payload}");
    assert!(payload["error"]
        .as_str()
        .unwrap()
        .starts_with("Malformed multipart upload"));
    assert!(app.provider.get_calls().is_empty());
    Ok(())
}
