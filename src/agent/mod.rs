pub mod r#loop;
pub mod service;

pub use r#loop::{AgentLoop, LoopState};
pub use service::ConversationService;
