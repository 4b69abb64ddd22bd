//! Conversation client
//!
//! [`ChatProvider`] is the seam between the lab and a hosted model.
//! [`GeminiClient`] implements it against the Gemini `generateContent` API.

mod client;

pub use client::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::lab::Turn;
use crate::Result;
use std::future::Future;

/// Reply to one submitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Raw reply text, tags included
    pub text: String,
    /// Prior turns, then the new user turn, then the new model turn
    pub history: Vec<Turn>,
}

impl ChatReply {
    /// Build the reply for `message` answered with `text` on top of `history`.
    pub fn new(history: &[Turn], message: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut updated = Vec::with_capacity(history.len() + 2);
        updated.extend_from_slice(history);
        updated.push(Turn::user(message));
        updated.push(Turn::model(text.clone()));
        Self {
            text,
            history: updated,
        }
    }
}

/// A conversational model that answers one message given a system
/// instruction and the turns so far.
pub trait ChatProvider {
    fn send_message(
        &self,
        system_instruction: &str,
        history: &[Turn],
        message: &str,
    ) -> impl Future<Output = Result<ChatReply>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::TurnRole;

    #[test]
    fn test_reply_appends_pair() {
        let prior = vec![Turn::user("hi"), Turn::model("hello")];
        let reply = ChatReply::new(&prior, "how are you?", "<response>fine</response>");
        assert_eq!(reply.history.len(), 4);
        assert_eq!(reply.history[..2], prior[..]);
        assert_eq!(reply.history[2], Turn::user("how are you?"));
        assert_eq!(reply.history[3].role, TurnRole::Model);
        assert_eq!(reply.history[3].content, "<response>fine</response>");
        assert_eq!(reply.text, "<response>fine</response>");
    }
}
