//! Hosted LLM chat
//!
//! The command interpreter falls through to a [`ChatSession`] for anything it
//! does not recognize as a built-in command.
//!
//! - **config**: API key, model and endpoint
//! - **context**: chat history kept within turn and token limits
//! - **gemini**: the Gemini `generateContent` adapter

pub mod config;
pub mod context;
pub mod gemini;

pub use config::LlmConfig;
pub use context::{ChatContext, ChatRole, ChatTurn};
pub use gemini::GeminiChat;

use crate::Result;

/// An ongoing conversation with a hosted model
pub trait ChatSession: Send {
    /// Send one query and return the reply text
    fn send(&mut self, query: &str) -> Result<String>;

    /// Forget the chat history
    fn reset(&mut self) {}
}
