pub mod command;
pub mod integration;
pub mod llm;
pub mod messages;
pub mod persistence;
pub mod services;
pub mod speech;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MurmurError {
    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    #[error("Capture error: {0}")]
    CaptureError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Lookup error: {0}")]
    LookupError(String),

    #[error("Image generation error: {0}")]
    ImageError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for MurmurError {
    fn from(e: std::io::Error) -> Self {
        MurmurError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for MurmurError {
    fn from(e: reqwest::Error) -> Self {
        MurmurError::HttpError(e.to_string())
    }
}

impl From<rusqlite::Error> for MurmurError {
    fn from(e: rusqlite::Error) -> Self {
        MurmurError::PersistenceError(e.to_string())
    }
}

impl MurmurError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // A single utterance failed; the worker keeps going
            MurmurError::SynthesisError(_) => true,
            MurmurError::CaptureError(_) => true,
            // Remote services are typically transient
            MurmurError::LlmError(_) => true,
            MurmurError::LookupError(_) => true,
            MurmurError::ImageError(_) => true,
            MurmurError::HttpError(_) => true,
            // Persistence is disabled for the run instead of retried
            MurmurError::PersistenceError(_) => false,
            MurmurError::ConfigError(_) => false,
            MurmurError::IOError(_) => false,
            MurmurError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            MurmurError::SynthesisError(_) => {
                "Speech output failed. The response is shown as text.".to_string()
            }
            MurmurError::CaptureError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            MurmurError::LlmError(_) => {
                "Sorry, I couldn't process that request.".to_string()
            }
            MurmurError::LookupError(_) => {
                "Sorry, I couldn't find any results on Wikipedia.".to_string()
            }
            MurmurError::ImageError(_) => {
                "I'm sorry, I couldn't generate that image. Please try a different description."
                    .to_string()
            }
            MurmurError::PersistenceError(_) => {
                "Conversation history is unavailable.".to_string()
            }
            MurmurError::HttpError(_) => {
                "A remote service could not be reached. Please try again.".to_string()
            }
            MurmurError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            MurmurError::IOError(_) => "File system error occurred.".to_string(),
            MurmurError::ChannelError(_) => {
                "Speech output has shut down. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
