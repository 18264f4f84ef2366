//! Integration tests against mocked Keyoku and chat completion servers

use httpmock::prelude::*;
use keyoku_demo::extraction::{
    ensure_extraction_schema, run_extraction, ExtractionOutput, ExtractionPreset,
};
use keyoku_demo::keyoku::JobStatus;
use keyoku_demo::{
    AgentId, DemoError, DemoSession, HistoryMessage, KeyokuChatbot, Panel, Reply, Settings,
    StatefulChatbot, TransitionMode,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

const SESSION: &str = "sess-test";

fn settings(server: &MockServer) -> Settings {
    Settings {
        keyoku_api_key: "keyoku-test".to_string(),
        openai_api_key: "openai-test".to_string(),
        ..Settings::default()
    }
    .with_keyoku_base_url(server.base_url())
    .with_llm_base_url(server.base_url())
    .with_session_id(SESSION)
}

fn schema(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("State schema for {name}"),
        "sharing_mode": "shared",
        "transition_mode": "warn",
        "version": 1,
        "schema_definition": {"type": "object"}
    })
}

async fn mock_schema_list(server: &MockServer, schemas: serde_json::Value) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/state-schemas")
                .query_param("limit", "100");
            then.status(200).json_body(json!({ "schemas": schemas }));
        })
        .await
}

async fn mock_completion<'a>(server: &'a MockServer, content: &str) -> httpmock::Mock<'a> {
    let body = json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    });
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(body);
        })
        .await
}

fn order_transition_rules() -> serde_json::Value {
    json!({
        "status": {
            "pending": ["confirmed", "cancelled"],
            "confirmed": ["processing", "cancelled"],
            "processing": ["shipped", "cancelled"],
            "shipped": ["delivered"],
            "delivered": [],
            "cancelled": []
        }
    })
}

// ─── Stateful agents ────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_reuses_existing_schema() {
    let server = MockServer::start_async().await;
    let list = mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state-schemas");
            then.status(201).json_body(schema("unexpected", "OrderProcessing"));
        })
        .await;

    let bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();

    assert_eq!(bot.schema_id(), Some("s-order"));
    assert_eq!(bot.session_id(), SESSION);
    list.assert_calls_async(1).await;
    create.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_connect_creates_schema_with_warn_transitions() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([])).await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state-schemas").json_body_includes(
                json!({
                    "name": "OrderProcessing",
                    "description": "State schema for Sales Agent",
                    "sharing_mode": "shared",
                    "transition_mode": "warn",
                    "transition_rules": order_transition_rules(),
                    "schema_definition": {"type": "object"}
                })
                .to_string(),
            );
            then.status(201).json_body(schema("s-new", "OrderProcessing"));
        })
        .await;

    let bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();

    assert_eq!(bot.schema_id(), Some("s-new"));
    assert_eq!(bot.transition_mode(), TransitionMode::Warn);
    create.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_connect_sends_strict_transition_mode_override() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([])).await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state-schemas").json_body_includes(
                json!({
                    "name": "OrderProcessing",
                    "transition_mode": "strict",
                    "transition_rules": order_transition_rules()
                })
                .to_string(),
            );
            then.status(201).json_body(schema("s-strict", "OrderProcessing"));
        })
        .await;

    let settings = settings(&server).with_transition_mode(TransitionMode::Strict);
    let bot = StatefulChatbot::connect(&settings, AgentId::Sales)
        .await
        .unwrap();

    assert_eq!(bot.schema_id(), Some("s-strict"));
    create.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_switch_agent_reuses_existing_schema() {
    let server = MockServer::start_async().await;
    let list = mock_schema_list(
        &server,
        json!([
            schema("s-order", "OrderProcessing"),
            schema("s-support", "SupportTicket")
        ]),
    )
    .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state-schemas");
            then.status(201).json_body(schema("unexpected", "SupportTicket"));
        })
        .await;

    let mut bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();
    bot.switch_agent("support-agent").await.unwrap();

    assert_eq!(bot.agent(), AgentId::Support);
    assert_eq!(bot.schema_id(), Some("s-support"));
    assert_eq!(bot.session_id(), SESSION);
    list.assert_calls_async(2).await;
    create.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_switch_agent_creates_missing_schema() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state-schemas");
            then.status(201).json_body(schema("s-support", "SupportTicket"));
        })
        .await;

    let mut bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();
    assert_eq!(bot.schema_id(), Some("s-order"));

    bot.switch_agent("support-agent").await.unwrap();

    assert_eq!(bot.agent(), AgentId::Support);
    assert_eq!(bot.schema_id(), Some("s-support"));
    assert_eq!(bot.session_id(), SESSION);
    create.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_unknown_agent_fails_without_remote_calls() {
    let server = MockServer::start_async().await;
    let list = mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;

    let mut bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();
    list.assert_calls_async(1).await;

    let err = bot.switch_agent("billing-agent").await.unwrap_err();

    assert!(matches!(err, DemoError::Validation(_)));
    assert!(err.to_string().contains("billing-agent"));
    assert_eq!(bot.agent(), AgentId::Sales);
    assert_eq!(bot.schema_id(), Some("s-order"));
    list.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_chat_without_schema_reports_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state-schemas");
            then.status(503).json_body(json!({ "message": "maintenance" }));
        })
        .await;
    let completion = mock_completion(&server, "should not be called").await;

    let bot = StatefulChatbot::connect(&settings(&server), AgentId::Scheduler)
        .await
        .unwrap();
    assert_eq!(bot.schema_id(), None);

    let reply = bot.chat("book me for Tuesday", &[]).await;
    assert_eq!(
        reply,
        Reply::Failed("Error: No state schema configured for this agent.".to_string())
    );

    let (reply, extraction) = bot.chat_with_state_extraction("hello", &[]).await;
    assert!(!reply.is_generated());
    assert!(extraction.is_none());
    completion.assert_calls_async(0).await;
}

#[tokio::test]
async fn test_chat_generation_failure_becomes_reply_text() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state");
            then.status(200).json_body(json!({ "states": [] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500)
                .json_body(json!({ "error": { "message": "model overloaded" } }));
        })
        .await;

    let bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();
    let reply = bot.chat("I want two widgets", &[]).await;

    assert!(!reply.is_generated());
    assert!(reply.text().starts_with("Error generating response: "), "{reply:?}");
    assert!(reply.text().contains("model overloaded"));
}

#[tokio::test]
async fn test_reply_starting_with_error_is_still_extracted() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state");
            then.status(200).json_body(json!({ "states": [] }));
        })
        .await;
    let text = "Error-free checkout done: your laptop order is confirmed.";
    mock_completion(&server, text).await;
    let extract = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state/extract");
            then.status(200).json_body(json!({
                "state": { "id": "st-1", "version": 1, "current_data": { "status": "confirmed" } },
                "is_new": true,
                "changed_fields": ["status"],
                "confidence": 0.9
            }));
        })
        .await;

    let mut session = DemoSession::start(&settings(&server), Some(AgentId::Sales))
        .await
        .unwrap();
    let turn = session
        .stateful_turn("Please confirm my laptop order")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(turn.reply, Reply::Generated(text.to_string()));
    assert!(turn.extraction.is_some());
    extract.assert_calls_async(1).await;
    assert_eq!(
        session.stateful_history(),
        &[
            HistoryMessage::user("Please confirm my laptop order"),
            HistoryMessage::assistant(text),
        ][..]
    );
}

#[tokio::test]
async fn test_extract_state_parses_outcome() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    let extract = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state/extract");
            then.status(200).json_body(json!({
                "state": {
                    "id": "st-1",
                    "schema_id": "s-order",
                    "agent_id": "sales-agent",
                    "version": 2,
                    "status": "active",
                    "current_data": { "order_status": "confirmed" }
                },
                "is_new": false,
                "changed_fields": ["order_status"],
                "confidence": 0.92,
                "reasoning": "Customer confirmed the order",
                "suggested_action": "ship"
            }));
        })
        .await;

    let bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();
    let outcome = bot
        .extract_state("Yes, confirm it", "Your order is confirmed.")
        .await
        .unwrap();

    assert!(!outcome.is_new);
    assert_eq!(outcome.changed_fields, vec!["order_status".to_string()]);
    assert_eq!(outcome.state.version, 2);
    assert_eq!(outcome.state.current_data["order_status"], "confirmed");
    assert_eq!(outcome.suggested_action.as_deref(), Some("ship"));
    assert_eq!(outcome.validation_error, None);
    extract.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_reset_session_continues_past_archive_failures() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/v1/state/session/{SESSION}"));
            then.status(200).json_body(json!({
                "states": [{ "id": "st-a" }, { "id": "st-b" }, { "id": "st-c" }]
            }));
        })
        .await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state/st-a/archive");
            then.status(500).json_body(json!({ "error": "locked" }));
        })
        .await;
    let archive_b = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state/st-b/archive");
            then.status(200).json_body(json!({}));
        })
        .await;
    let archive_c = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/state/st-c/archive");
            then.status(200).json_body(json!({}));
        })
        .await;

    let mut bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();
    let new_session = bot.reset_session().await.unwrap();

    assert!(new_session.starts_with("stateful-"));
    assert_ne!(new_session, SESSION);
    assert_eq!(bot.session_id(), new_session);
    failing.assert_calls_async(1).await;
    archive_b.assert_calls_async(1).await;
    archive_c.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_state_history_truncates_trigger_and_timestamp() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/state")
                .query_param("status", "active")
                .query_param("limit", "1");
            then.status(200)
                .json_body(json!({ "states": [{ "id": "st-1", "version": 3 }] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state/st-1/history");
            then.status(200).json_body(json!({
                "transitions": [{
                    "from_version": 2,
                    "to_version": 3,
                    "changed_fields": ["order_status"],
                    "trigger": "x".repeat(80),
                    "created_at": "2024-05-01T10:20:30.123456Z"
                }]
            }));
        })
        .await;

    let bot = StatefulChatbot::connect(&settings(&server), AgentId::Sales)
        .await
        .unwrap();
    let rows = bot.state_history().await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].trigger, Some(format!("{}...", "x".repeat(50))));
    assert_eq!(rows[0].created_at, "2024-05-01T10:20:30");
    assert_eq!(rows[0].to_version, 3);
}

// ─── Display cache through a session ────────────────────────────────

#[tokio::test]
async fn test_panel_keeps_last_good_value_until_forced() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    let mut ok = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state-schemas/s-order");
            then.status(200).json_body(schema("s-order", "OrderProcessing"));
        })
        .await;

    let mut session = DemoSession::start(&settings(&server), Some(AgentId::Sales))
        .await
        .unwrap();
    let first = session.panel(Panel::SchemaInfo).await.unwrap();
    assert!(first.contains("\"name\": \"OrderProcessing\""), "{first}");

    ok.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state-schemas/s-order");
            then.status(502).json_body(json!({ "message": "bad gateway" }));
        })
        .await;

    assert_eq!(session.panel(Panel::SchemaInfo).await.unwrap(), first);
    assert_eq!(session.panel(Panel::SchemaInfo).await.unwrap(), first);

    let panels = session.force_refresh().await.unwrap();
    assert!(panels.schema_info.starts_with("Error: "), "{}", panels.schema_info);
    assert!(panels.schema_info.contains("bad gateway"));
}

#[tokio::test]
async fn test_session_switch_to_unknown_agent_keeps_cache() {
    let server = MockServer::start_async().await;
    mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/state-schemas/s-order");
            then.status(200).json_body(schema("s-order", "OrderProcessing"));
        })
        .await;

    let mut session = DemoSession::start(&settings(&server), Some(AgentId::Sales))
        .await
        .unwrap();
    session.panel(Panel::SchemaInfo).await.unwrap();
    assert!(session.cache().get(Panel::SchemaInfo).is_some());

    assert!(session.switch_agent("nobody").await.is_err());
    assert!(session.cache().get(Panel::SchemaInfo).is_some());
}

#[tokio::test]
async fn test_memory_session_never_touches_state_schemas() {
    let server = MockServer::start_async().await;
    let list = mock_schema_list(&server, json!([schema("s-order", "OrderProcessing")])).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/search");
            then.status(200).json_body(json!({ "results": [] }));
        })
        .await;
    mock_completion(&server, "Hello!").await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/remember");
            then.status(500).json_body(json!({ "detail": "queue full" }));
        })
        .await;

    let mut session = DemoSession::start(&settings(&server), None).await.unwrap();
    assert!(session.stateful().is_none());
    assert_eq!(session.memory_turn("hi").await.as_deref(), Some("Hello!"));
    assert_eq!(session.memory_history().len(), 2);

    let err = session.stateful_turn("hi").await.unwrap_err();
    assert!(matches!(err, DemoError::Validation(_)));
    assert!(session.panel(Panel::CurrentState).await.is_err());

    let new_id = session.new_session().await.unwrap();
    assert!(new_id.starts_with("session-"), "{new_id}");
    assert_eq!(session.memory().session_id(), new_id);
    assert!(session.memory_history().is_empty());
    list.assert_calls_async(0).await;
}

// ─── Memory chat ────────────────────────────────────────────────────

#[tokio::test]
async fn test_memory_chat_stores_turn() {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/search");
            then.status(200).json_body(json!({
                "results": [{ "id": "m1", "content": "User's name is Ada", "importance": 0.8 }]
            }));
        })
        .await;
    mock_completion(&server, "Nice to see you again, Ada!").await;
    let remember = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/remember");
            then.status(202)
                .json_body(json!({ "id": "job-1", "status": "pending" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/jobs/job-1");
            then.status(200)
                .json_body(json!({ "id": "job-1", "status": "completed", "memory_ids": ["m2"] }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let reply = bot.chat("Hi, it's me again", &[]).await;

    assert_eq!(reply, "Nice to see you again, Ada!");
    search.assert_calls_async(1).await;
    remember.assert_calls_async(1).await;
}

#[tokio::test]
async fn test_memory_chat_survives_search_and_storage_failures() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/search");
            then.status(500).json_body(json!({ "detail": "index offline" }));
        })
        .await;
    mock_completion(&server, "Hello!").await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/remember");
            then.status(500).json_body(json!({ "detail": "queue full" }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    assert_eq!(bot.chat("hello", &[]).await, "Hello!");
}

#[tokio::test]
async fn test_remember_wait_completes_or_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/remember");
            then.status(202)
                .json_body(json!({ "id": "job-slow", "status": "pending" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/jobs/job-slow");
            then.status(200)
                .json_body(json!({ "id": "job-slow", "status": "processing" }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let job = bot.remember("I like tea").await.unwrap();
    assert_eq!(job.id(), "job-slow");
    let err = job.wait(Duration::from_millis(600)).await.unwrap_err();
    assert!(err.is_timeout(), "{err}");
}

#[tokio::test]
async fn test_remember_wait_reports_failed_job() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/remember");
            then.status(202)
                .json_body(json!({ "id": "job-f", "status": "failed", "error": "bad input" }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let err = bot
        .remember("???")
        .await
        .unwrap()
        .wait(Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, DemoError::Remote(_)));
    assert!(err.to_string().contains("bad input"));
}

#[tokio::test]
async fn test_memories_are_truncated_for_display() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/memories")
                .query_param("limit", "20")
                .query_param("agent_id", "demo-assistant");
            then.status(200).json_body(json!({
                "memories": [
                    { "id": "m1", "content": "a".repeat(150), "type": "fact", "importance": 0.9 },
                    { "id": "m2", "content": "short", "type": "preference" }
                ]
            }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let rows = bot.memories(20).await.unwrap();

    assert_eq!(rows[0].content, format!("{}...", "a".repeat(100)));
    assert_eq!(rows[1].content, "short");
    assert_eq!(rows[1].importance, 0.5);
}

#[tokio::test]
async fn test_relationships_resolve_entity_names() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/entities");
            then.status(200).json_body(json!({
                "entities": [
                    { "id": "e1", "canonical_name": "Alice", "type": "person" },
                    { "id": "e2", "canonical_name": "Acme", "type": "organization" }
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/relationships");
            then.status(200).json_body(json!({
                "relationships": [
                    { "source_entity_id": "e1", "target_entity_id": "e2", "relationship_type": "works_at" },
                    { "source_entity_id": "e1", "target_entity_id": "e-unknown-123456", "relationship_type": "knows" }
                ]
            }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let rows = bot.relationships(10).await.unwrap();

    assert_eq!(rows[0].source, "Alice");
    assert_eq!(rows[0].target, "Acme");
    assert_eq!(rows[1].relationship_type, "knows");
    assert_eq!(rows[1].target, "e-unknow...");
}

#[tokio::test]
async fn test_export_and_clear() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/data/export");
            then.status(202)
                .json_body(json!({ "job_id": "exp-9", "status": "pending" }));
        })
        .await;
    let clear = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/v1/memories");
            then.status(204);
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let started = bot.export_data().await.unwrap();
    assert_eq!(started.message(), "Export job started with ID: exp-9");
    bot.clear_all_memories().await.unwrap();
    clear.assert_calls_async(1).await;
}

// ─── Custom extraction ──────────────────────────────────────────────

#[tokio::test]
async fn test_extraction_falls_back_to_job_records() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/schemas");
            then.status(200).json_body(json!({ "schemas": [] }));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/schemas");
            then.status(201)
                .json_body(json!({ "id": "x-1", "name": "Product Feedback" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/remember");
            then.status(202)
                .json_body(json!({ "id": "job-x", "status": "completed" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/extractions/job/job-x");
            then.status(200).json_body(json!({
                "extractions": [{
                    "id": "ex-1",
                    "confidence": 0.8,
                    "extracted_data": { "sentiment": "mixed" }
                }],
                "total": 1
            }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let schema_id = ensure_extraction_schema(bot.client(), ExtractionPreset::ProductFeedback)
        .await
        .unwrap();
    assert_eq!(schema_id, "x-1");
    create.assert_calls_async(1).await;

    let output = run_extraction(&bot, &schema_id, "Decent app", Duration::from_secs(5))
        .await
        .unwrap();
    match output {
        ExtractionOutput::Records(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].0, "ex-1");
            assert_eq!(records[0].2["sentiment"], "mixed");
        }
        other => panic!("Expected extraction records, got {other:?}"),
    }
}

#[tokio::test]
async fn test_extraction_uses_inline_job_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/remember");
            then.status(202)
                .json_body(json!({ "id": "job-i", "status": "pending" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/jobs/job-i");
            then.status(200).json_body(json!({
                "id": "job-i",
                "status": "completed",
                "custom_extracted_data": { "mood_state": "anxious", "risk_level": "low" }
            }));
        })
        .await;
    let by_job = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/extractions/job/job-i");
            then.status(200).json_body(json!({ "extractions": [] }));
        })
        .await;

    let bot = KeyokuChatbot::new(&settings(&server)).unwrap();
    let job = bot.remember_with_schema("I can't sleep", "x-2").await.unwrap();
    let job = job.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let output = run_extraction(&bot, "x-2", "I can't sleep", Duration::from_secs(5))
        .await
        .unwrap();
    match output {
        ExtractionOutput::Inline(data) => assert_eq!(data["mood_state"], "anxious"),
        other => panic!("Expected inline data, got {other:?}"),
    }
    by_job.assert_calls_async(0).await;
}

// ─── Configuration ──────────────────────────────────────────────────

#[test]
fn test_settings_from_config_file_and_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[keyoku]
api_key = "file-key"
base_url = "http://keyoku.local"
transition_mode = "strict"

[llm]
model = "gpt-4o-mini"
"#,
    )
    .unwrap();

    let file = keyoku_demo::config::ConfigFile::read(&path).unwrap();
    let settings = Settings::resolve(file, |key| match key {
        "KEYOKU_BASE_URL" => Some("http://override.local".to_string()),
        "OPENAI_API_KEY" => Some("sk-env".to_string()),
        _ => None,
    });

    assert_eq!(settings.keyoku_api_key, "file-key");
    assert_eq!(settings.keyoku_base_url, "http://override.local");
    assert_eq!(settings.llm_model, "gpt-4o-mini");
    assert_eq!(settings.transition_mode, keyoku_demo::TransitionMode::Strict);
    assert!(settings.validate().is_empty());
}

#[test]
fn test_missing_keys_are_reported() {
    let settings = Settings::resolve(None, |_| None);
    assert_eq!(
        settings.validate(),
        vec![
            "KEYOKU_API_KEY is required".to_string(),
            "OPENAI_API_KEY is required".to_string()
        ]
    );
    assert!(settings.ensure_valid().is_err());
}
