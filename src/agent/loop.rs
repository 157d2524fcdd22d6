//! Agent control loop
//!
//! A three-state machine that alternates between the completion provider
//! and tool execution until the model answers without requesting tools.
//! Tool failures are folded into tool-result text so the model can recover
//! on its next turn; provider failures abort the invocation.

use crate::error::{AgentError, Result};
use crate::llm::{ChatMessage, CompletionProvider, ToolCallRequest, ToolSchema};
use crate::tools::{ToolCall, ToolContext};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum LoopState {
    AwaitingModel,
    AwaitingTools(Vec<ToolCallRequest>),
    Done,
}

pub struct AgentLoop<'a> {
    provider: &'a dyn CompletionProvider,
    context: &'a ToolContext,
    system_prompt: Option<&'a str>,
    max_rounds: usize,
    schemas: Vec<ToolSchema>,
}

impl<'a> AgentLoop<'a> {
    pub fn new(
        provider: &'a dyn CompletionProvider,
        context: &'a ToolContext,
        system_prompt: Option<&'a str>,
        max_rounds: usize,
    ) -> Self {
        Self {
            provider,
            context,
            system_prompt,
            max_rounds,
            schemas: ToolCall::schemas(),
        }
    }

    /// Drive one conversation to completion, returning the extended
    /// history. The history is append-only: never reordered or truncated.
    pub async fn run(&self, mut history: Vec<ChatMessage>) -> Result<Vec<ChatMessage>> {
        let mut state = LoopState::AwaitingModel;
        let mut rounds = 0usize;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    rounds += 1;
                    if rounds > self.max_rounds {
                        return Err(AgentError::Execution(format!(
                            "agent loop exceeded {} rounds without a terminal response",
                            self.max_rounds
                        )));
                    }

                    let response = self.provider.complete(&self.window(&history), &self.schemas).await?;
                    debug!(
                        round = rounds,
                        tool_calls = response.tool_calls.len(),
                        "model turn complete"
                    );
                    let pending = response.tool_calls.clone();
                    history.push(response);

                    if pending.is_empty() {
                        LoopState::Done
                    } else {
                        LoopState::AwaitingTools(pending)
                    }
                }
                LoopState::AwaitingTools(calls) => {
                    // One result per call, in the order the calls were
                    // issued, each carrying its originating call id.
                    for call in &calls {
                        let output = self.execute_call(call).await;
                        history.push(ChatMessage::tool_result(&call.id, output));
                    }
                    LoopState::AwaitingModel
                }
                LoopState::Done => return Ok(history),
            };
        }
    }

    /// Conversation as the provider sees it: the configured system prompt
    /// is prepended transiently and never persisted into the history.
    fn window(&self, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut window = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = self.system_prompt {
            window.push(ChatMessage::system(prompt));
        }
        window.extend_from_slice(history);
        window
    }

    async fn execute_call(&self, call: &ToolCallRequest) -> String {
        let outcome = match ToolCall::parse(&call.name, &call.arguments) {
            Ok(tool) => tool.execute(self.context).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(text) => text,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool execution failed");
                format!("Tool '{}' failed: {}", call.name, e)
            }
        }
    }
}
