//! Markdown notes sessions.
//!
//! While a notes session is active the engine appends every utterance to a
//! timestamped markdown file instead of interpreting it. Files live in a
//! flat directory so they are easy to inspect, edit, and back up.

use crate::error::{AssistantError, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

/// File-backed notes store.
#[derive(Debug, Clone)]
pub struct NotesStore {
    dir: PathBuf,
}

impl NotesStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory holding the note files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create a new timestamped note file and return its path.
    pub fn create(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S%.3f");
        let path = self.dir.join(format!("note_{stamp}.md"));
        std::fs::write(&path, format!("# Нотатки від {stamp}\n\n"))?;
        Ok(path)
    }

    /// Append one line to a note.
    pub fn append(&self, path: &Path, text: &str) -> Result<()> {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| AssistantError::Notes(format!("cannot open note {}: {e}", path.display())))?;
        writeln!(file, "- {text}")
            .map_err(|e| AssistantError::Notes(format!("cannot append to note: {e}")))?;
        Ok(())
    }

    /// Read a note's full contents.
    pub fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| AssistantError::Notes(format!("cannot read note {}: {e}", path.display())))
    }

    /// The most recently modified note, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn create_append_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = NotesStore::new(dir.path().join("notes"));

        let path = store.create().unwrap();
        store.append(&path, "перша думка").unwrap();
        store.append(&path, "друга думка").unwrap();

        let body = store.read(&path).unwrap();
        assert!(body.starts_with("# Нотатки від"));
        assert!(body.contains("- перша думка\n"));
        assert!(body.contains("- друга думка\n"));
    }

    #[test]
    fn latest_returns_newest_note() {
        let dir = tempfile::tempdir().unwrap();
        let store = NotesStore::new(dir.path().to_path_buf());

        let first = store.create().unwrap();
        // Ensure distinct mtimes even on coarse filesystems.
        std::thread::sleep(std::time::Duration::from_millis(20));
        let second = store.create().unwrap();
        let _ = first;

        // Touch the second file so its mtime is strictly newer.
        store.append(&second, "x").unwrap();
        assert_eq!(store.latest().unwrap().unwrap(), second);
    }

    #[test]
    fn latest_on_missing_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = NotesStore::new(dir.path().join("nothing-here"));
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn append_to_missing_note_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = NotesStore::new(dir.path().to_path_buf());
        let missing = dir.path().join("absent.md");
        assert!(store.append(&missing, "текст").is_err());
    }
}
