//! End-to-end agent loop tests against a scripted completion provider and
//! an in-memory SQLite warehouse.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use warehouse_agent::agent::{AgentLoop, ConversationService};
use warehouse_agent::error::{AgentError, Result};
use warehouse_agent::llm::{ChatMessage, CompletionProvider, Role, ToolCallRequest, ToolSchema};
use warehouse_agent::tools::ToolContext;
use warehouse_agent::db::WarehouseClient;

/// Returns a fixed sequence of assistant messages, one per call.
struct ScriptedProvider {
    script: Mutex<Vec<ChatMessage>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: Vec<ChatMessage>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, _messages: &[ChatMessage], _tools: &[ToolSchema]) -> Result<ChatMessage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().expect("script lock");
        if script.is_empty() {
            return Err(AgentError::Provider("script exhausted".to_string()));
        }
        Ok(script.remove(0))
    }
}

fn tool_call_message(id: &str, name: &str, arguments: serde_json::Value) -> ChatMessage {
    let mut message = ChatMessage::assistant("");
    message.tool_calls = vec![ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }];
    message
}

async fn seeded_context() -> ToolContext {
    let client = WarehouseClient::connect(Some("sqlite::memory:".to_string()), None, None)
        .await
        .expect("in-memory warehouse");
    client
        .query("CREATE TABLE metrics (day TEXT, clicks INTEGER)", &[])
        .await
        .unwrap();
    client
        .query("INSERT INTO metrics VALUES ('2024-01-01', 10), ('2024-01-02', 12)", &[])
        .await
        .unwrap();
    ToolContext {
        warehouse: Arc::new(client),
    }
}

#[tokio::test]
async fn test_round_trip_one_tool_then_terminal() {
    let context = seeded_context().await;
    let provider = ScriptedProvider::new(vec![
        tool_call_message(
            "call_1",
            "run_sql",
            json!({"statement": "SELECT SUM(clicks) AS total FROM metrics"}),
        ),
        ChatMessage::assistant("Total clicks: 22."),
    ]);

    let agent_loop = AgentLoop::new(&provider, &context, Some("be helpful"), 8);
    let history = agent_loop
        .run(vec![ChatMessage::user("how many clicks?")])
        .await
        .unwrap();

    // original + assistant tool request + tool result + terminal assistant
    assert_eq!(history.len(), 4);
    assert_eq!(provider.call_count(), 2);

    assert_eq!(history[0].role, Role::User);
    assert!(history[1].has_tool_calls());
    assert_eq!(history[2].role, Role::Tool);
    assert_eq!(history[2].tool_call_id.as_deref(), Some("call_1"));
    assert!(history[2].content.contains("22"));
    assert_eq!(history[3].content, "Total clicks: 22.");

    // The transient system prompt must not be persisted into the history.
    assert!(history.iter().all(|m| m.role != Role::System));
}

#[tokio::test]
async fn test_tool_failure_becomes_result_text_and_loop_continues() {
    let context = seeded_context().await;
    let provider = ScriptedProvider::new(vec![
        tool_call_message("call_1", "run_sql", json!({"statement": "SELECT broken FROM"})),
        ChatMessage::assistant("The query failed, let me know if I should retry."),
    ]);

    let agent_loop = AgentLoop::new(&provider, &context, None, 8);
    let history = agent_loop
        .run(vec![ChatMessage::user("run something broken")])
        .await
        .unwrap();

    assert_eq!(history.len(), 4);
    assert_eq!(provider.call_count(), 2);
    assert_eq!(history[2].role, Role::Tool);
    assert!(history[2].content.contains("Tool 'run_sql' failed"));
}

#[tokio::test]
async fn test_invalid_tool_arguments_do_not_abort() {
    let context = seeded_context().await;
    let provider = ScriptedProvider::new(vec![
        tool_call_message("call_1", "run_sql", json!({"max_rows": "not even a number"})),
        ChatMessage::assistant("done"),
    ]);

    let agent_loop = AgentLoop::new(&provider, &context, None, 8);
    let history = agent_loop.run(vec![ChatMessage::user("go")]).await.unwrap();

    assert_eq!(history.len(), 4);
    assert!(history[2].content.contains("failed"));
}

#[tokio::test]
async fn test_multiple_calls_answered_in_original_order() {
    let context = seeded_context().await;
    let mut request = ChatMessage::assistant("");
    request.tool_calls = vec![
        ToolCallRequest {
            id: "call_a".to_string(),
            name: "describe_table".to_string(),
            arguments: json!({"table": "metrics"}),
        },
        ToolCallRequest {
            id: "call_b".to_string(),
            name: "run_sql".to_string(),
            arguments: json!({"statement": "SELECT COUNT(*) AS n FROM metrics"}),
        },
    ];
    let provider = ScriptedProvider::new(vec![request, ChatMessage::assistant("done")]);

    let agent_loop = AgentLoop::new(&provider, &context, None, 8);
    let history = agent_loop.run(vec![ChatMessage::user("inspect")]).await.unwrap();

    assert_eq!(history.len(), 5);
    assert_eq!(history[2].tool_call_id.as_deref(), Some("call_a"));
    assert_eq!(history[3].tool_call_id.as_deref(), Some("call_b"));
    assert!(history[2].content.starts_with("- Table metrics"));
}

#[tokio::test]
async fn test_provider_error_aborts_the_invocation() {
    let context = seeded_context().await;
    let provider = ScriptedProvider::new(vec![]);

    let agent_loop = AgentLoop::new(&provider, &context, None, 8);
    let err = agent_loop.run(vec![ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, AgentError::Provider(_)));
}

#[tokio::test]
async fn test_round_bound_stops_endless_ping_pong() {
    let context = seeded_context().await;
    // Every turn requests another tool call; the loop must give up.
    let script: Vec<ChatMessage> = (0..10)
        .map(|i| {
            tool_call_message(
                &format!("call_{}", i),
                "run_sql",
                json!({"statement": "SELECT 1"}),
            )
        })
        .collect();
    let provider = ScriptedProvider::new(script);

    let agent_loop = AgentLoop::new(&provider, &context, None, 3);
    let err = agent_loop.run(vec![ChatMessage::user("loop forever")]).await.unwrap_err();
    assert!(matches!(err, AgentError::Execution(_)));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_service_returns_extended_history() {
    let context = seeded_context().await;
    let provider = Arc::new(ScriptedProvider::new(vec![ChatMessage::assistant(
        "No tools needed.",
    )]));

    let service = ConversationService::new(provider.clone(), context, "assist", 8);
    let history = service
        .handle(vec![ChatMessage::user("hello")])
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "No tools needed.");
    assert_eq!(provider.call_count(), 1);
}
