//! # Console Workflow Tests
//!
//! The playground, escalation rules, bots, corrections and the taxonomy
//! editor, driven through the HTTP API.

mod common;

use anyhow::Result;
use common::{TestApp, ANALYSIS_KEY, TURN_KEY};
use serde_json::json;

fn urgent_rule() -> serde_json::Value {
    json!({
        "name": "Urgent customers",
        "triggers": [{ "id": "T-1", "type": "Sentiment", "condition": "Is", "value": "Urgent" }],
        "actions": [{ "id": "A-1", "type": "Transfer to Human" }]
    })
}

#[tokio::test]
async fn test_chat_turn_is_logged_and_escalated() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let (rule_status, _) = app.post_json("/rules", urgent_rule()).await?;
    app.provider.add_response(
        TURN_KEY,
        &json!({
            "reply": "Hemen yardımcı oluyorum.",
            "intent": "complaint",
            "category": "Şikayet",
            "confidence": 0.4,
            "sentiment": "Urgent"
        })
        .to_string(),
    );

    // --- Act ---
    let (status, body) = app
        .post_json("/chat", json!({ "message": "Siparişim hala gelmedi!" }))
        .await?;
    let (_, logs) = app.get_json("/logs?status=reflected").await?;
    let (_, stats) = app.get_json("/stats").await?;

    // --- Assert ---
    assert_eq!(rule_status, 200);
    assert_eq!(status, 200);
    let turn = &body["result"];
    assert_eq!(turn["reply"], "Hemen yardımcı oluyorum.");
    assert_eq!(turn["degraded"], false);
    assert_eq!(turn["log"]["status"], "REFLECTED");
    assert_eq!(turn["escalations"][0]["ruleName"], "Urgent customers");
    assert_eq!(logs["result"].as_array().unwrap().len(), 1);
    assert_eq!(stats["result"]["agentLogs"], 1);
    assert_eq!(stats["result"]["criticalLogs"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_chat_degrades_and_rejects_bad_input() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    app.provider.fail_with("network down");

    // --- Act ---
    let (_, degraded) = app.post_json("/chat", json!({ "message": "Merhaba" })).await?;
    let (blank_status, _) = app.post_json("/chat", json!({ "message": "  " })).await?;
    let (bot_status, _) = app
        .post_json("/chat", json!({ "message": "Merhaba", "botId": "BOT-missing" }))
        .await?;
    let (_, logs) = app.get_json("/logs").await?;

    // --- Assert ---
    assert_eq!(degraded["result"]["degraded"], true);
    assert_eq!(degraded["result"]["reply"], "Üzgünüm, şu an yanıt veremiyorum.");
    assert_eq!(blank_status, 400);
    assert_eq!(bot_status, 404);
    assert_eq!(logs["result"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_correction_stores_a_golden_script() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    app.provider.add_response(
        TURN_KEY,
        r#"{"reply":"Bilmiyorum.","intent":"shipping","category":"Kargo","confidence":0.5}"#,
    );
    let (_, chat) = app.post_json("/chat", json!({ "message": "Kargo ne zaman?" })).await?;
    let log_id = chat["result"]["log"]["id"].as_str().unwrap().to_string();

    // --- Act ---
    let (status, corrected) = app
        .post_json(
            &format!("/logs/{log_id}/correct"),
            json!({ "correctedResponse": "Kargo 3 iş gününde gelir." }),
        )
        .await?;
    let (_, golden) = app.get_json("/scripts?golden=true").await?;
    let (missing_status, _) = app
        .post_json("/logs/LOG-missing/correct", json!({ "correctedResponse": "x" }))
        .await?;

    // --- Assert ---
    assert_eq!(status, 200);
    assert_eq!(corrected["result"]["status"], "CORRECTED");
    assert_eq!(corrected["result"]["aiResponse"], "Kargo 3 iş gününde gelir.");
    let golden = golden["result"].as_array().unwrap();
    assert_eq!(golden.len(), 1);
    assert_eq!(golden[0]["content"], "Kargo 3 iş gününde gelir.");
    assert_eq!(golden[0]["kbId"], "kb_general");
    assert_eq!(golden[0]["confidence"], 1.0);
    assert_eq!(missing_status, 404);
    Ok(())
}

#[tokio::test]
async fn test_invalid_rules_are_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (no_triggers, _) = app
        .post_json(
            "/rules",
            json!({ "name": "Empty", "triggers": [], "actions": [{ "id": "A", "type": "Webhook" }] }),
        )
        .await?;
    let (_, created) = app.post_json("/rules", urgent_rule()).await?;
    let rule_id = created["result"]["id"].as_str().unwrap().to_string();
    let (update_status, updated) = app
        .put_json(
            &format!("/rules/{rule_id}"),
            json!({ "name": "Renamed", "isActive": false, "triggers": urgent_rule()["triggers"], "actions": urgent_rule()["actions"] }),
        )
        .await?;

    assert_eq!(no_triggers, 400);
    assert!(rule_id.starts_with("RULE-"));
    assert_eq!(update_status, 200);
    assert_eq!(updated["result"]["isActive"], false);
    Ok(())
}

#[tokio::test]
async fn test_bot_lifecycle_and_prompt_draft() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    app.provider
        .add_response("AI Engineer", "You are Ada, a courteous shipping assistant.");

    // --- Act ---
    let (_, draft) = app
        .post_json(
            "/bots/prompt",
            json!({ "name": "Ada", "role": "shipping assistant", "tone": "Friendly" }),
        )
        .await?;
    let (_, bot) = app
        .post_json(
            "/bots",
            json!({ "name": "Ada", "role": "shipping assistant", "systemPrompt": draft["result"]["text"] }),
        )
        .await?;
    let bot_id = bot["result"]["id"].as_str().unwrap().to_string();
    let (delete_status, _) = app.delete_json(&format!("/bots/{bot_id}")).await?;
    let (_, bots) = app.get_json("/bots").await?;

    // --- Assert ---
    assert_eq!(
        draft["result"]["text"],
        "You are Ada, a courteous shipping assistant."
    );
    assert_eq!(
        bot["result"]["systemPrompt"],
        "You are Ada, a courteous shipping assistant."
    );
    assert_eq!(bot["result"]["maxResponseLength"], 500);
    assert_eq!(delete_status, 200);
    assert_eq!(bots["result"], json!([]));
    let calls = app.provider.get_calls();
    assert!(calls[0].user_prompt.contains("Tone: Friendly"));
    Ok(())
}

#[tokio::test]
async fn test_taxonomy_editor_workflow() -> Result<()> {
    // --- Arrange ---
    let app = TestApp::spawn().await?;
    let kb_id = app.create_bank("Destek").await?;
    let (_, group) = app
        .post_json("/taxonomy", json!({ "name": "Destek", "kbId": kb_id }))
        .await?;
    let group_id = group["result"]["id"].as_str().unwrap().to_string();
    app.provider.add_response(
        ANALYSIS_KEY,
        r#"{"intent":"shipping_time","keywords":["kargo","süre"],"confidence":0.8}"#,
    );

    // --- Act ---
    let (_, imported) = app
        .post_json(
            "/taxonomy/bulk",
            json!({ "parentId": group_id, "lines": "Kargo\nİade\nkargo\n\n" }),
        )
        .await?;
    let kargo_id = imported["result"][0]["id"].as_str().unwrap().to_string();
    let (_, added) = app
        .post_json(
            &format!("/taxonomy/{kargo_id}/scripts"),
            json!({ "text": "Kargo 3 iş gününde gelir.\nkısa\n" }),
        )
        .await?;
    let (_, associated) = app.get_json(&format!("/taxonomy/{kargo_id}/scripts")).await?;
    let (cycle_status, _) = app
        .put_json(&format!("/taxonomy/{group_id}"), json!({ "parentId": kargo_id }))
        .await?;
    let (_, removed) = app.delete_json(&format!("/taxonomy/{group_id}")).await?;
    let (_, remaining) = app.get_json("/taxonomy").await?;

    // --- Assert ---
    assert_eq!(imported["result"].as_array().unwrap().len(), 2);
    let added = added["result"].as_array().unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0]["category"], "Kargo");
    assert_eq!(added[0]["kbId"], kb_id.as_str());
    assert_eq!(associated["result"].as_array().unwrap().len(), 1);
    assert_eq!(cycle_status, 400);
    assert_eq!(removed["result"].as_array().unwrap().len(), 3);
    assert_eq!(remaining["result"], json!([]));
    Ok(())
}
