//! SQLite-backed transcript store

use super::TranscriptStore;
use crate::messages::{ImageRef, Message, Role, SessionId};
use crate::{MurmurError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info, warn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id         TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    role       TEXT NOT NULL,
    content    TEXT NOT NULL,
    image_url  TEXT,
    timestamp  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, timestamp);
";

/// Transcript store in a single SQLite file
pub struct SqliteTranscriptStore {
    conn: Mutex<Connection>,
}

impl SqliteTranscriptStore {
    /// Open (or create) the database file and verify it is usable
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!("Transcript store opened at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        // Equivalent of a ping: the connection must answer a trivial query
        let ok: Option<i64> = conn
            .query_row("SELECT 1", [], |row| row.get(0))
            .optional()?;
        if ok != Some(1) {
            return Err(MurmurError::PersistenceError(
                "database did not answer the health check".into(),
            ));
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TranscriptStore for SqliteTranscriptStore {
    fn insert(&self, message: &Message, session_id: &SessionId) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, image_url, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                session_id.as_str(),
                message.role.as_str(),
                message.content,
                message.image.as_ref().map(|i| i.as_str()),
                format_timestamp(&message.timestamp),
            ],
        )?;
        debug!("Persisted {} message in session {}", message.role.as_str(), session_id.short());
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<SessionId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT session_id FROM messages
             GROUP BY session_id
             ORDER BY MIN(timestamp) ASC",
        )?;

        let sessions = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions.into_iter().map(SessionId::from).collect())
    }

    fn load_session(&self, session_id: &SessionId) -> Result<Vec<Message>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT role, content, image_url, timestamp FROM messages
             WHERE session_id = ?1
             ORDER BY timestamp ASC, rowid ASC",
        )?;

        let rows = stmt
            .query_map([session_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut messages = Vec::with_capacity(rows.len());
        for (role, content, image_url, timestamp) in rows {
            let Some(role) = Role::parse(&role) else {
                warn!("Skipping stored message with unknown role '{}'", role);
                continue;
            };
            messages.push(Message::restore(
                role,
                content,
                image_url.map(ImageRef::new),
                parse_timestamp(&timestamp),
            ));
        }

        Ok(messages)
    }
}

// Fixed-width UTC timestamps sort lexicographically in time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
