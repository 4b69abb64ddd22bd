//! Promptlab - Prompt A/B Lab
//!
//! Sends the same user messages through two coach prompt templates and
//! shows the replies side by side:
//! - Formats user context into the template placeholder
//! - Talks to Gemini with a per-variant conversation history
//! - Extracts `<response>` and `<actionitems>` blocks from the replies

pub mod commands;
pub mod config;
pub mod gemini;
pub mod lab;
pub mod prompt;
pub mod tui;

pub use config::LabConfig;
pub use gemini::{ChatProvider, ChatReply, GeminiClient};
pub use lab::{Lab, Turn, TurnRole, UserInfo, Variant, VariantId};
pub use prompt::{
    build_user_context, extract_action_items, extract_response_content, merge_prompt,
    UserContext, USERINFO_PLACEHOLDER,
};

/// Result type for Promptlab operations
pub type Result<T> = std::result::Result<T, LabError>;

/// Errors that can occur in Promptlab
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("Missing API credential: set {0}")]
    MissingCredential(String),

    #[error("Model provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
