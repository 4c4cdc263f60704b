//! Transcript persistence
//!
//! The conversation store mirrors every appended message into a
//! [`TranscriptStore`] keyed by session identifier, and restores earlier
//! sessions from it.

pub mod sqlite;

pub use sqlite::SqliteTranscriptStore;

use crate::messages::{Message, SessionId};
use crate::Result;

/// Document store holding the messages of every session
pub trait TranscriptStore: Send + Sync {
    /// Persist one message under the given session
    fn insert(&self, message: &Message, session_id: &SessionId) -> Result<()>;

    /// Identifiers of every session that has at least one stored message
    fn list_sessions(&self) -> Result<Vec<SessionId>>;

    /// All messages of a session in timestamp order
    fn load_session(&self, session_id: &SessionId) -> Result<Vec<Message>>;
}
