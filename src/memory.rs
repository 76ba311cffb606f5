//! Long-term facts memory.
//!
//! A single SQLite table of free-text facts the user asked the assistant to
//! remember. Retrieval is plain keyword overlap — enough to surface a few
//! relevant facts into the chat context without any embedding machinery.

use crate::error::{AssistantError, Result};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

/// Prefixes stripped from a "remember that …" utterance before storing.
const REMEMBER_PREFIXES: [&str; 3] = ["запам'ятай що", "запам'ятай", "занотуй"];

/// SQLite-backed facts store.
///
/// Thread-safe via an internal `Mutex<Connection>`; all access is
/// serialized, which matches the single-worker turn loop.
pub struct FactStore {
    conn: Mutex<Connection>,
}

impl FactStore {
    /// Open (or create) the facts database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| AssistantError::Memory(format!("cannot open facts db: {e}")))?;
        Self::with_connection(conn)
    }

    /// An in-memory store, used by tests and ephemeral sessions.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AssistantError::Memory(format!("cannot open facts db: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS facts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .map_err(|e| AssistantError::Memory(format!("cannot apply schema: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AssistantError::Memory("facts store mutex poisoned".to_owned()))
    }

    /// Store a fact, stripping the "remember that" prefix from the
    /// utterance. Returns the stored text.
    pub fn remember(&self, utterance: &str) -> Result<String> {
        let mut text = utterance.trim();
        let lowered = text.to_lowercase();
        for prefix in REMEMBER_PREFIXES {
            if lowered.starts_with(prefix) {
                text = text[prefix.len()..].trim_start();
                break;
            }
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::Memory("nothing to remember".to_owned()));
        }

        let conn = self.lock()?;
        conn.execute("INSERT INTO facts (text) VALUES (?1)", params![text])
            .map_err(|e| AssistantError::Memory(format!("cannot store fact: {e}")))?;
        Ok(text.to_owned())
    }

    /// Return up to `limit` facts ranked by word overlap with the query.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let query_words: std::collections::HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if query_words.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT text FROM facts")
            .map_err(|e| AssistantError::Memory(format!("cannot read facts: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| AssistantError::Memory(format!("cannot read facts: {e}")))?;

        let mut scored: Vec<(usize, String)> = Vec::new();
        for row in rows {
            let fact = row.map_err(|e| AssistantError::Memory(format!("cannot read fact: {e}")))?;
            let overlap = fact
                .to_lowercase()
                .split_whitespace()
                .filter(|w| query_words.contains(*w))
                .count();
            if overlap > 0 {
                scored.push((overlap, fact));
            }
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, f)| f).collect())
    }

    /// Number of stored facts.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))
            .map_err(|e| AssistantError::Memory(format!("cannot count facts: {e}")))?;
        Ok(count as usize)
    }

    /// Erase all stored facts.
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM facts", [])
            .map_err(|e| AssistantError::Memory(format!("cannot clear facts: {e}")))?;
        Ok(())
    }
}
