//! Environment-driven configuration
//!
//! All settings are read once at process start (after `dotenv`) and handed
//! to the service by reference. There is no lazy global state.

use std::env;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_ROUNDS: usize = 16;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Warehouse connection URL. `None` falls back to an in-memory SQLite
    /// database so the service starts without any external configuration.
    pub warehouse_url: Option<String>,

    /// Override for the backend's default catalog segment.
    pub default_catalog: Option<String>,

    /// Override for the backend's default schema segment.
    pub default_schema: Option<String>,

    /// OpenAI-compatible API key. Missing key is a configuration error
    /// surfaced when the provider is constructed, before any request.
    pub api_key: Option<String>,

    pub model: String,
    pub base_url: String,

    /// Safety bound on model/tool ping-pong within one conversation.
    pub max_rounds: usize,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let max_rounds = env::var("AGENT_MAX_ROUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_ROUNDS);

        Self {
            warehouse_url: env::var("SQL_WAREHOUSE_URL").ok(),
            default_catalog: env::var("SQL_DEFAULT_CATALOG").ok(),
            default_schema: env::var("SQL_DEFAULT_SCHEMA").ok(),
            api_key: env::var("OPENAI_API_KEY").ok(),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            max_rounds,
        }
    }
}

/// Fixed instruction text prepended (transiently) to every conversation.
pub fn system_prompt() -> &'static str {
    "You are an analytics assistant. Answer succinctly and use the available tools when necessary."
}
