use super::types::{Message, SessionId};
use crate::persistence::TranscriptStore;
use crate::{MurmurError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
struct Conversation {
    session_id: SessionId,
    messages: Vec<Message>,
}

/// Ordered transcript of the current session.
///
/// Appends are mirrored to the optional [`TranscriptStore`]. Mirroring is
/// fire-and-forget: a failed write is logged and the in-memory transcript
/// stays authoritative.
#[derive(Clone)]
pub struct ConversationStore {
    conversation: Arc<RwLock<Conversation>>,
    persistence: Option<Arc<dyn TranscriptStore>>,
}

impl ConversationStore {
    /// In-memory only store with a fresh session
    pub fn new() -> Self {
        Self {
            conversation: Arc::new(RwLock::new(Conversation {
                session_id: SessionId::generate(),
                messages: Vec::new(),
            })),
            persistence: None,
        }
    }

    /// Store mirrored to the given persistence backend
    pub fn with_persistence(persistence: Arc<dyn TranscriptStore>) -> Self {
        Self {
            persistence: Some(persistence),
            ..Self::new()
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn session_id(&self) -> SessionId {
        self.conversation.read().session_id.clone()
    }

    pub fn append(&self, message: Message) {
        let session_id = {
            let mut conversation = self.conversation.write();
            conversation.messages.push(message.clone());
            conversation.session_id.clone()
        };

        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.insert(&message, &session_id) {
                warn!("Failed to persist message: {}", e);
            }
        }
    }

    /// Snapshot of the transcript in append order
    pub fn messages(&self) -> Vec<Message> {
        self.conversation.read().messages.clone()
    }

    pub fn get(&self, index: usize) -> Option<Message> {
        self.conversation.read().messages.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.conversation.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.read().messages.is_empty()
    }

    /// Drop the in-memory transcript and switch to `session_id`.
    /// Persisted messages are left untouched.
    pub fn reset(&self, session_id: SessionId) {
        let mut conversation = self.conversation.write();
        conversation.messages.clear();
        conversation.session_id = session_id;
        info!("Started session {}", conversation.session_id);
    }

    /// Reset to a freshly generated session identifier
    pub fn start_new_session(&self) -> SessionId {
        let session_id = SessionId::generate();
        self.reset(session_id.clone());
        session_id
    }

    /// Replace the transcript with a persisted session.
    ///
    /// Returns the number of restored messages. The store is left unchanged
    /// when persistence is disabled, the query fails, or the session is empty.
    pub fn load(&self, session_id: &SessionId) -> Result<usize> {
        let persistence = self.persistence_or_err()?;
        let messages = persistence.load_session(session_id)?;
        if messages.is_empty() {
            return Err(MurmurError::PersistenceError(format!(
                "no stored messages for session {}",
                session_id
            )));
        }

        let count = messages.len();
        let mut conversation = self.conversation.write();
        conversation.messages = messages;
        conversation.session_id = session_id.clone();
        info!("Loaded session {} ({} messages)", session_id, count);
        Ok(count)
    }

    /// Sessions known to the persistence backend
    pub fn list_sessions(&self) -> Result<Vec<SessionId>> {
        self.persistence_or_err()?.list_sessions()
    }

    fn persistence_or_err(&self) -> Result<&Arc<dyn TranscriptStore>> {
        self.persistence
            .as_ref()
            .ok_or_else(|| MurmurError::PersistenceError("persistence is not connected".into()))
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Role;
    use crate::persistence::SqliteTranscriptStore;

    #[test]
    fn test_append_preserves_order() {
        let store = ConversationStore::new();
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));
        store.append(Message::user("three"));

        let contents: Vec<_> = store.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(store.get(1).map(|m| m.role), Some(Role::Assistant));
        assert!(store.get(3).is_none());
    }

    #[test]
    fn test_reset_clears_and_changes_session() {
        let store = ConversationStore::new();
        for i in 0..5 {
            store.append(Message::user(format!("msg {}", i)));
        }
        let before = store.session_id();

        let after = store.start_new_session();

        assert!(store.is_empty());
        assert_ne!(before, after);
        assert_eq!(store.session_id(), after);
    }

    #[test]
    fn test_load_without_persistence_fails() {
        let store = ConversationStore::new();
        store.append(Message::user("keep me"));
        assert!(store.load(&SessionId::from("other")).is_err());
        assert!(store.list_sessions().is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_mirrored_session_can_be_reloaded() {
        let backend = Arc::new(SqliteTranscriptStore::open_in_memory().unwrap());
        let store = ConversationStore::with_persistence(backend);

        store.append(Message::user("what is rust"));
        store.append(Message::assistant("a language"));
        let original = store.session_id();

        store.start_new_session();
        store.append(Message::user("unrelated"));

        let restored = store.load(&original).unwrap();
        assert_eq!(restored, 2);
        assert_eq!(store.session_id(), original);
        assert_eq!(store.messages()[1].content, "a language");
        assert_eq!(store.list_sessions().unwrap().len(), 2);
    }

    #[test]
    fn test_load_empty_session_leaves_store_unchanged() {
        let backend = Arc::new(SqliteTranscriptStore::open_in_memory().unwrap());
        let store = ConversationStore::with_persistence(backend);
        store.append(Message::user("current"));
        let current = store.session_id();

        assert!(store.load(&SessionId::from("missing")).is_err());
        assert_eq!(store.session_id(), current);
        assert_eq!(store.len(), 1);
    }
}
