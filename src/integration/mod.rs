//! Integration layer
//!
//! Wires the speech queue, conversation store, persistence and remote
//! services into one [`Assistant`].

pub mod assistant;
pub mod config;

pub use assistant::{greeting_for_hour, Assistant, AssistantStatus, Collaborators};
pub use config::{AssistantConfig, CaptureConfig, PersistenceConfig, SpeechTiming};
