//! Keyoku Demo
//!
//! A terminal client that shows off the Keyoku memory service:
//! - Memory chat with retrieval and background memory storage
//! - Knowledge graph and audit panels
//! - Stateful agents whose conversation state is extracted by schema
//! - Custom extraction schemas run alongside memory storage

pub mod agent;
pub mod chatbot;
pub mod commands;
pub mod config;
pub mod display;
pub mod extraction;
pub mod history;
mod http;
pub mod keyoku;
pub mod llm;
pub mod prompts;
pub mod session;

pub use agent::{AgentId, Reply, StatefulChatbot, TransitionMode};
pub use chatbot::KeyokuChatbot;
pub use config::Settings;
pub use display::{DisplayCache, Panel};
pub use history::{pairs_to_messages, reconcile_history, HistoryMessage, Role};
pub use keyoku::KeyokuClient;
pub use session::DemoSession;

/// Result type for demo operations
pub type Result<T> = std::result::Result<T, DemoError>;

/// Errors that can occur in the demo
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Any failure reported by a remote service (Keyoku or the LLM)
    #[error("{0}")]
    Remote(String),

    /// A remote call or background job did not finish in time
    #[error("timed out: {0}")]
    Timeout(String),

    /// Invalid local argument, e.g. an unknown agent id
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DemoError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DemoError::Timeout(_))
    }
}
