//! Configuration for the hosted chat model

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Gemini chat session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key; chat is disabled when absent or empty
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Base URL of the generative language API
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum number of turns kept as chat history
    pub max_turns: usize,

    /// Rough token budget for the history sent with each request
    pub context_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash-001".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
            max_turns: 40,
            context_tokens: 8192,
        }
    }
}

impl LlmConfig {
    /// Create a configuration with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The API key, if one is usable
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
