use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid tool input: {0}")]
    ToolInput(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Completion provider error: {0}")]
    Provider(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for AgentError {
    fn from(err: sqlx::Error) -> Self {
        AgentError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
