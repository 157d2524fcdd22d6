//! Conversation service boundary
//!
//! Accepts an ordered message history, drives the agent loop once, and
//! returns the extended history. One loop instance per inbound request; the
//! only shared state is the process-wide warehouse client.

use crate::agent::AgentLoop;
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionProvider};
use crate::tools::ToolContext;
use std::sync::Arc;
use tracing::{error, info};

pub struct ConversationService {
    provider: Arc<dyn CompletionProvider>,
    context: ToolContext,
    system_prompt: String,
    max_rounds: usize,
}

impl ConversationService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        context: ToolContext,
        system_prompt: impl Into<String>,
        max_rounds: usize,
    ) -> Self {
        Self {
            provider,
            context,
            system_prompt: system_prompt.into(),
            max_rounds,
        }
    }

    /// Run one conversation invocation to completion.
    pub async fn handle(&self, messages: Vec<ChatMessage>) -> Result<Vec<ChatMessage>> {
        let inbound = messages.len();
        let agent_loop = AgentLoop::new(
            self.provider.as_ref(),
            &self.context,
            Some(&self.system_prompt),
            self.max_rounds,
        );

        match agent_loop.run(messages).await {
            Ok(history) => {
                info!(inbound, outbound = history.len(), "conversation complete");
                Ok(history)
            }
            Err(e) => {
                error!(inbound, error = %e, "conversation aborted");
                Err(e)
            }
        }
    }
}
