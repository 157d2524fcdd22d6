//! Chat message model and completion provider
//!
//! The agent loop only depends on the [`CompletionProvider`] trait; the
//! shipped implementation talks to any OpenAI-compatible chat-completions
//! endpoint over reqwest.

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A model-issued request to execute a named tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Pending tool-call requests attached by the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Identifier of the originating call, set on tool-result messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Declared input schema of one tool, in OpenAI function form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The external capability that, given conversation history and tool
/// schemas, returns exactly one assistant message.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<ChatMessage>;
}

pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    /// Build from config; a missing API key is a configuration error, kept
    /// distinct from runtime provider failures.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            AgentError::Configuration(
                "OPENAI_API_KEY is not set; the completion provider is unavailable".to_string(),
            )
        })?;
        Ok(Self::new(api_key, config.model.clone(), config.base_url.clone()))
    }

    fn to_wire(message: &ChatMessage) -> Value {
        let mut wire = json!({
            "role": message.role,
            "content": message.content,
        });
        if !message.tool_calls.is_empty() {
            wire["tool_calls"] = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        },
                    })
                })
                .collect::<Vec<_>>()
                .into();
        }
        if let Some(call_id) = &message.tool_call_id {
            wire["tool_call_id"] = json!(call_id);
        }
        wire
    }

    fn parse_message(message: &Value) -> Result<ChatMessage> {
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string();

        let mut tool_calls = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
            for call in calls {
                let id = call
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| AgentError::Provider("tool call without an id".to_string()))?
                    .to_string();
                let name = call["function"]["name"]
                    .as_str()
                    .ok_or_else(|| AgentError::Provider("tool call without a function name".to_string()))?
                    .to_string();
                let raw_arguments = call["function"]["arguments"].as_str().unwrap_or("{}");
                let arguments: Value = serde_json::from_str(raw_arguments).map_err(|e| {
                    AgentError::Provider(format!(
                        "malformed tool call arguments for '{}': {}",
                        name, e
                    ))
                })?;
                tool_calls.push(ToolCallRequest { id, name, arguments });
            }
        }

        Ok(ChatMessage {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSchema]) -> Result<ChatMessage> {
        let api_messages: Vec<Value> = messages.iter().map(Self::to_wire).collect();
        let api_tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    },
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": api_messages,
            "tools": api_tools,
            "tool_choice": "auto",
            "temperature": 0.1,
        });

        // Use max_completion_tokens for newer models, max_tokens for older ones
        if self.model.starts_with("gpt-5") || self.model.contains("o1") {
            body["max_completion_tokens"] = json!(2000);
        } else if self.model.starts_with("gpt-4") {
            body["max_completion_tokens"] = json!(1000);
        } else {
            body["max_tokens"] = json!(1000);
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Provider(format!("completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Provider(format!(
                "completion API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("failed to parse completion response: {}", e)))?;

        if let Some(error) = response_json.get("error") {
            return Err(AgentError::Provider(format!(
                "completion API error: {}",
                error
            )));
        }

        let choices = response_json
            .get("choices")
            .and_then(|c| c.as_array())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AgentError::Provider("no choices in completion response".to_string()))?;

        Self::parse_message(&choices[0]["message"])
    }
}
