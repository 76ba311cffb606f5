//! Rolling conversation state for one assistant session.
//!
//! The session holds the only mutable state the turn loop touches: a
//! capacity-bounded turn history (oldest evicted first), the pending
//! confirmation slot owned by the safety gate, and the active notes file.
//! It is owned exclusively by the worker that processes utterances.

use crate::command::StructuredCommand;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

/// One remembered turn of the conversation.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// An irreversible command parked while the assistant waits for an
/// explicit confirmation.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub command: StructuredCommand,
    pub requested_at: Instant,
}

/// Mutable per-session state.
#[derive(Debug)]
pub struct SessionState {
    history: VecDeque<Turn>,
    capacity: usize,
    /// Set by the safety gate; cleared by confirm/cancel or expiry.
    pub pending_confirmation: Option<PendingAction>,
    /// Updated on every processed utterance.
    pub last_interaction: Option<Instant>,
    /// While set, utterances are appended to this note instead of being
    /// interpreted as commands.
    pub notes_session: Option<PathBuf>,
}

impl SessionState {
    /// Create a session with the given history capacity (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            pending_confirmation: None,
            last_interaction: None,
            notes_session: None,
        }
    }

    /// Record a user turn, evicting the oldest turn when full.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(TurnRole::User, text.into());
    }

    /// Record an assistant turn, evicting the oldest turn when full.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(TurnRole::Assistant, text.into());
    }

    fn push(&mut self, role: TurnRole, text: String) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(Turn { role, text });
    }

    /// Iterate the remembered turns, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    /// Render the history as dialogue lines for an LLM context window.
    #[must_use]
    pub fn context_window(&self) -> String {
        let mut out = String::new();
        for turn in &self.history {
            let role = match turn.role {
                TurnRole::User => "Користувач",
                TurnRole::Assistant => "Асистент",
            };
            out.push_str(role);
            out.push_str(": ");
            out.push_str(&turn.text);
            out.push('\n');
        }
        out
    }

    /// Mark the session as touched now.
    pub fn touch(&mut self) {
        self.last_interaction = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn history_evicts_oldest_first() {
        let mut session = SessionState::new(3);
        session.push_user("один");
        session.push_assistant("два");
        session.push_user("три");
        session.push_user("чотири");

        let texts: Vec<&str> = session.history().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["два", "три", "чотири"]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut session = SessionState::new(0);
        session.push_user("а");
        session.push_user("б");
        assert_eq!(session.history().count(), 1);
        assert_eq!(session.history().next().unwrap().text, "б");
    }

    #[test]
    fn context_window_labels_roles() {
        let mut session = SessionState::new(4);
        session.push_user("відкрий телеграм");
        session.push_assistant("Запускаю: Телеграм");
        let ctx = session.context_window();
        assert!(ctx.contains("Користувач: відкрий телеграм"));
        assert!(ctx.contains("Асистент: Запускаю: Телеграм"));
    }

    #[test]
    fn fresh_session_has_no_pending_confirmation() {
        let session = SessionState::new(4);
        assert!(session.pending_confirmation.is_none());
        assert!(session.notes_session.is_none());
    }
}
