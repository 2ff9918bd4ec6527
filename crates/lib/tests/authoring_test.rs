//! # Authoring Helper Tests
//!
//! Covers the static fallbacks of the prompt helpers and adding analyzed
//! scripts to a category.

mod common;

use anybot::{
    authoring::Authoring,
    correct_response,
    store::{Action, Store},
    types::{Language, LogStatus, Script, ScriptStatus, TaxonomyCategory, Tone},
};
use anybot_test_utils::MockAiProvider;
use anyhow::Result;
use common::setup_tracing;

#[tokio::test]
async fn helpers_fall_back_to_static_text() {
    // --- Arrange ---
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.fail_with("offline");
    let authoring = Authoring::new(provider.boxed(), Language::En);
    let script = Script {
        id: "S".to_string(),
        content: "Kargo 3 günde gelir.".to_string(),
        primary_intent: "i".to_string(),
        category: "c".to_string(),
        keywords: vec![],
        confidence: 0.7,
        status: ScriptStatus::Processed,
        kb_id: "KB".to_string(),
        is_golden: false,
    };

    // --- Act & Assert ---
    assert_eq!(
        authoring.generate_bot_prompt("Ada", "support", Tone::Friendly).await,
        "Error occurred."
    );
    assert_eq!(authoring.generate_category_context("Kargo", &[script.clone()]).await, "Error.");
    assert_eq!(authoring.generate_test_question(&script).await, "Error.");
    assert!(!authoring.verify_connection().await);
}

#[tokio::test]
async fn empty_replies_use_their_own_fallbacks() {
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.add_response("AI Engineer", "  ");
    provider.add_response("AI Training Expert", "");
    let authoring = Authoring::new(provider.boxed(), Language::Tr);

    assert_eq!(
        authoring.generate_bot_prompt("Ada", "support", Tone::Concise).await,
        "You are a helpful assistant."
    );
    assert_eq!(authoring.generate_category_context("Kargo", &[]).await, "Analysis failed.");
    let calls = provider.get_calls();
    assert!(calls[0].system_prompt.contains("TURKISH"));
    assert!(calls[0].user_prompt.contains("Tone: Concise"));
}

#[tokio::test]
async fn analyzed_lines_are_added_to_the_category() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let store = Store::in_memory();
    let mut group = TaxonomyCategory::new("G".to_string(), "Destek", None);
    group.kb_id = Some("KB-GROUP".to_string());
    store.dispatch(Action::AddCategory(group)).await?;
    store
        .dispatch(Action::AddCategory(TaxonomyCategory::new(
            "C".to_string(),
            "Kargo",
            Some("G".to_string()),
        )))
        .await?;
    let provider = MockAiProvider::new();
    provider.add_response(
        "Analyze the text",
        r#"{"intent":"shipping","keywords":["kargo"],"confidence":0.4}"#,
    );
    let authoring = Authoring::new(provider.boxed(), Language::Tr);

    // --- Act ---
    let added = authoring
        .analyze_and_add_scripts(&store, "C", "Kargo ücretsizdir.\nkısa\n\nKargo takibi SMS ile yapılır.")
        .await?;

    // --- Assert ---
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|s| s.confidence == 0.95
        && s.category == "Kargo"
        && s.kb_id == "KB-GROUP"
        && s.primary_intent == "shipping"
        && s.id.starts_with("SCR-AUTO-")));
    assert_eq!(store.snapshot().await.scripts.len(), 2);
    assert_eq!(provider.get_calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn correction_marks_the_log_and_stores_golden_data() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let store = Store::in_memory();
    let provider = MockAiProvider::new();
    provider.push_response(r#"{"reply":"Bilmiyorum.","intent":"shipping","category":"Kargo"}"#);
    let session = anybot::ChatSession::new(store.clone(), provider.boxed(), None);
    let turn = session.send("kargom nerede").await?;
    let log = turn.log.expect("turn should be stored");

    // --- Act ---
    store
        .dispatch(correct_response(&log, "Kargonuz yolda.", None))
        .await?;

    // --- Assert ---
    let state = store.snapshot().await;
    let stored = state.agent_log(&log.id).expect("log should exist");
    assert_eq!(stored.status, LogStatus::Corrected);
    assert_eq!(stored.ai_response, "Kargonuz yolda.");
    assert!(state.scripts[0].is_golden);
    assert_eq!(state.scripts[0].confidence, 1.0);
    assert_eq!(state.scripts[0].keywords, vec!["shipping", "kargom", "nerede"]);
    Ok(())
}
