pub mod storage;
pub mod types;

pub use storage::ConversationStore;
pub use types::{ImageRef, Message, Role, SessionId};
