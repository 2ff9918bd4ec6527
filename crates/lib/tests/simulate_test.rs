//! # Conversational Simulator Tests
//!
//! Verifies the knowledge shortlist, the agent-turn fallbacks and the chat
//! session's degradation and escalation handling.

mod common;

use anybot::{
    simulate::{apology, shortlist, ChatSession, Simulator, SHORTLIST_LIMIT},
    store::{Action, Store},
    types::{
        ActionType, Bot, EscalationAction, EscalationRule, EscalationTrigger, Language, LogStatus,
        Script, ScriptStatus, Sentiment, TokenUsage, TriggerCondition, TriggerType,
    },
};
use anybot_test_utils::MockAiProvider;
use anyhow::Result;
use common::setup_tracing;
use serde_json::json;

const TURN_KEY: &str = "Answer the customer's question";

fn script(id: &str, kb_id: &str, content: &str) -> Script {
    Script {
        id: id.to_string(),
        content: content.to_string(),
        primary_intent: "info".to_string(),
        category: "Genel".to_string(),
        keywords: vec![],
        confidence: 0.9,
        status: ScriptStatus::Processed,
        kb_id: kb_id.to_string(),
        is_golden: false,
    }
}

fn urgent_rule() -> EscalationRule {
    EscalationRule {
        id: "RULE-1".to_string(),
        name: "Urgent customers".to_string(),
        is_active: true,
        triggers: vec![EscalationTrigger {
            id: "T-1".to_string(),
            trigger_type: TriggerType::Sentiment,
            condition: TriggerCondition::Is,
            value: "Urgent".to_string(),
        }],
        actions: vec![EscalationAction {
            id: "A-1".to_string(),
            action_type: ActionType::TransferToHuman,
            recipients: None,
            message: None,
        }],
    }
}

#[test]
fn shortlist_matches_are_bounded_and_contain_the_input() {
    let scripts: Vec<Script> = (0..12)
        .map(|i| {
            let content = if i % 2 == 0 {
                format!("İade işlemi {i} gün sürer")
            } else {
                format!("Kargo bilgisi {i}")
            };
            script(&format!("S{i}"), "KB", &content)
        })
        .collect();

    let picked = shortlist("KARGO", &scripts);

    assert!(picked.len() <= SHORTLIST_LIMIT);
    assert_eq!(picked.len(), 5);
    assert!(picked
        .iter()
        .all(|s| s.content.to_lowercase().contains("kargo")));
    assert_eq!(picked[0].id, "S1");
}

#[tokio::test]
async fn turn_is_wrapped_as_a_verified_log() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let provider = MockAiProvider::new().with_usage(TokenUsage {
        prompt: 120,
        completion: 30,
        total: 150,
    });
    provider.add_response(
        TURN_KEY,
        &json!({
            "reply": "Kargonuz 3 gün içinde gelir.",
            "intent": "shipping_time",
            "category": "Kargo",
            "reasoning": "Knowledge covers shipping.",
            "confidence": 0.92,
            "sentiment": "neutral"
        })
        .to_string(),
    );
    let scripts = vec![
        script("S-1", "KB-1", "Kargo 3 iş gününde teslim edilir."),
        script("S-2", "KB-2", "Kargo ücretsizdir."),
    ];
    let simulator = Simulator::new(provider.boxed(), Language::Tr);

    // --- Act ---
    let log = simulator.simulate_turn("kargo", &scripts, None).await?;

    // --- Assert ---
    assert_eq!(log.status, LogStatus::Verified);
    assert_eq!(log.ai_response, "Kargonuz 3 gün içinde gelir.");
    assert_eq!(log.intent, "shipping_time");
    assert_eq!(log.confidence, 0.92);
    assert_eq!(log.sentiment, Some(Sentiment::Neutral));
    assert_eq!(log.source_script_id.as_deref(), Some("S-1"));
    assert_eq!(log.reference_kb_id.as_deref(), Some("KB-1"));
    assert_eq!(log.token_usage.total, 150);
    assert!(log.duration_ms.is_some());

    let calls = provider.get_calls();
    assert!(calls[0]
        .user_prompt
        .contains("Kargo 3 iş gününde teslim edilir.\n---\nKargo ücretsizdir."));
    assert!(calls[0].system_prompt.starts_with("You are an AI assistant."));
    assert!(calls[0].options.response_schema.is_some());
    Ok(())
}

#[tokio::test]
async fn missing_fields_fall_back() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.add_response(TURN_KEY, r#"{"sentiment":"furious"}"#);
    let simulator = Simulator::new(provider.boxed(), Language::En);

    // --- Act ---
    let log = simulator.simulate_turn("anything", &[], None).await?;

    // --- Assert ---
    assert_eq!(log.ai_response, "No reply.");
    assert_eq!(log.intent, "General");
    assert_eq!(log.category, "General");
    assert_eq!(log.confidence, 0.7);
    assert_eq!(log.reasoning, "");
    assert_eq!(log.sentiment, None);
    assert_eq!(log.token_usage, TokenUsage::default());
    assert_eq!(log.source_script_id, None);
    Ok(())
}

#[tokio::test]
async fn fenced_reply_is_unwrapped() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.add_response(
        TURN_KEY,
        "```json\n{\"reply\": \"Merhaba!\", \"intent\": \"greeting\", \"confidence\": 0.8}\n```",
    );
    let simulator = Simulator::new(provider.boxed(), Language::Tr);

    // --- Act ---
    let log = simulator.simulate_turn("merhaba", &[], None).await?;

    // --- Assert ---
    assert_eq!(log.ai_response, "Merhaba!");
    assert_eq!(log.intent, "greeting");
    assert_eq!(log.confidence, 0.8);
    Ok(())
}

#[tokio::test]
async fn placeholder_text_in_the_question_is_sent_verbatim() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.add_response(TURN_KEY, r#"{"reply":"ok"}"#);
    let scripts = vec![script("S-1", "KB-1", "Kargo 3 iş gününde teslim edilir.")];
    let simulator = Simulator::new(provider.boxed(), Language::En);

    // --- Act ---
    simulator.simulate_turn("{knowledge}", &scripts, None).await?;

    // --- Assert ---
    let call = &provider.get_calls()[0];
    assert_eq!(call.user_prompt, "Question: {knowledge}\nKnowledge: ");
    Ok(())
}

#[tokio::test]
async fn bot_restricts_knowledge_and_sets_persona() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.add_response(TURN_KEY, r#"{"reply":"ok"}"#);
    let scripts = vec![
        script("S-1", "KB-OTHER", "Kargo başka bankada."),
        script("S-2", "KB-BOT", "Kargo bu bankada."),
    ];
    let mut bot = Bot::new("Ada", "a shipping assistant", vec!["KB-BOT".to_string()]);
    bot.temperature = 0.2;
    let simulator = Simulator::new(provider.boxed(), Language::Tr).with_sampling(0.9, 0.95);

    // --- Act ---
    let log = simulator.simulate_turn("kargo", &scripts, Some(&bot)).await?;

    // --- Assert ---
    assert_eq!(log.source_script_id.as_deref(), Some("S-2"));
    let call = &provider.get_calls()[0];
    assert!(!call.user_prompt.contains("başka"));
    assert!(call.system_prompt.starts_with("You are Ada, a shipping assistant."));
    assert!(call.system_prompt.contains("same language"));
    assert_eq!(call.options.temperature, Some(0.2));
    assert_eq!(call.options.top_p, Some(0.95));
    Ok(())
}

#[tokio::test]
async fn provider_errors_propagate_from_the_simulator() {
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.fail_with("quota exceeded");
    let simulator = Simulator::new(provider.boxed(), Language::En);

    let result = simulator.simulate_turn("hi", &[], None).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn chat_session_degrades_to_the_apology() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let store = Store::in_memory();
    let provider = MockAiProvider::new();
    provider.fail_with("network down");
    let session = ChatSession::new(store.clone(), provider.boxed(), None);

    // --- Act ---
    let turn = session.send("Merhaba").await?;

    // --- Assert ---
    assert!(turn.degraded);
    assert_eq!(turn.reply, apology(Language::Tr));
    assert!(turn.log.is_none());
    assert!(store.snapshot().await.agent_logs.is_empty());
    Ok(())
}

#[tokio::test]
async fn chat_session_stores_logs_and_reflects_escalations() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let store = Store::in_memory();
    store.dispatch(Action::AddEscalationRule(urgent_rule())).await?;
    let provider = MockAiProvider::new();
    provider.push_response(r#"{"reply":"Hemen yardımcı oluyorum.","sentiment":"Urgent"}"#);
    provider.push_response(r#"{"reply":"Rica ederim.","sentiment":"Positive"}"#);
    let session = ChatSession::new(store.clone(), provider.boxed(), None);

    // --- Act ---
    let urgent = session.send("ACİL! Siparişim kayboldu").await?;
    let calm = session.send("Teşekkürler").await?;

    // --- Assert ---
    assert_eq!(urgent.escalations.len(), 1);
    assert_eq!(urgent.escalations[0].rule_id, "RULE-1");
    assert_eq!(urgent.log.as_ref().map(|l| l.status), Some(LogStatus::Reflected));
    assert!(calm.escalations.is_empty());
    assert_eq!(calm.log.as_ref().map(|l| l.status), Some(LogStatus::Verified));

    let state = store.snapshot().await;
    assert_eq!(state.agent_logs.len(), 2);
    assert_eq!(state.agent_logs[0].ai_response, "Rica ederim.");
    Ok(())
}

#[tokio::test]
async fn chat_session_rejects_unknown_bots_and_blank_input() {
    setup_tracing();
    let store = Store::in_memory();
    let provider = MockAiProvider::new();

    let blank = ChatSession::new(store.clone(), provider.boxed(), None)
        .send("   ")
        .await;
    let unknown = ChatSession::new(store, provider.boxed(), Some("BOT-x".to_string()))
        .send("hello")
        .await;

    assert!(matches!(blank, Err(anybot::ChatError::BlankInput)));
    assert!(matches!(unknown, Err(anybot::ChatError::UnknownBot(id)) if id == "BOT-x"));
}
