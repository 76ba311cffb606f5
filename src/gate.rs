//! Confirmation gate for irreversible commands.
//!
//! A command flagged as irreversible (power off, suspend, privileged
//! remote execution) is never dispatched directly. The gate parks it in
//! the session's pending slot and asks for an explicit confirmation; the
//! next utterance must be a confirm or cancel phrase. Anything else
//! re-prompts — it is never executed as an unrelated command while a
//! confirmation is pending. A second irreversible command while one is
//! pending is ignored and the original prompt re-emitted.
//!
//! Pending confirmations expire after a configurable timeout, checked
//! lazily at the next utterance. Gate state lives in [`SessionState`], so
//! a fresh engine always starts idle.

use crate::command::StructuredCommand;
use crate::session::{PendingAction, SessionState};
use std::time::{Duration, Instant};
use tracing::info;

/// Phrases that confirm the pending action.
const CONFIRM_PHRASES: [&str; 3] = ["підтверджую", "підтвердити", "так, виконуй"];

/// Phrases that discard the pending action.
const CANCEL_PHRASES: [&str; 4] = ["скасувати", "скасуй", "відміна", "стоп"];

/// What the gate decided about a freshly resolved command.
#[derive(Debug)]
pub enum GateDecision {
    /// Safe to execute now.
    Dispatch(StructuredCommand),
    /// Parked; the prompt must be spoken to the user.
    AwaitConfirmation { prompt: String },
    /// Another confirmation is already pending; the new irreversible
    /// command was ignored and the original prompt repeats.
    AlreadyPending { prompt: String },
}

/// What the gate decided about an utterance while a confirmation pends.
#[derive(Debug)]
pub enum ConfirmationOutcome {
    /// No confirmation was pending (or it had expired) — process the
    /// utterance normally. The flag reports whether an expired pending
    /// action was just discarded.
    NotPending { expired: bool },
    /// The parked command may now be dispatched, exactly once.
    Confirmed(StructuredCommand),
    /// The parked command was discarded.
    Cancelled,
    /// Neither confirm nor cancel; the prompt must be repeated.
    Reprompt { prompt: String },
}

/// The confirmation state machine.
#[derive(Debug, Clone, Copy)]
pub struct SafetyGate {
    timeout: Duration,
}

impl SafetyGate {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Submit a resolved command. Irreversible commands are parked in the
    /// session's pending slot; everything else passes straight through.
    pub fn submit(&self, session: &mut SessionState, command: StructuredCommand) -> GateDecision {
        if !command.needs_confirmation() {
            return GateDecision::Dispatch(command);
        }

        if let Some(pending) = &session.pending_confirmation {
            info!(
                parked = pending.command.intent.tag(),
                ignored = command.intent.tag(),
                "irreversible command ignored while confirmation pending"
            );
            return GateDecision::AlreadyPending {
                prompt: prompt_for(&pending.command),
            };
        }

        let prompt = prompt_for(&command);
        info!(tag = command.intent.tag(), "awaiting confirmation");
        session.pending_confirmation = Some(PendingAction {
            command,
            requested_at: Instant::now(),
        });
        GateDecision::AwaitConfirmation { prompt }
    }

    /// Check an utterance against the pending confirmation, if any.
    ///
    /// Must be called before any matching happens for the turn.
    pub fn resolve(&self, session: &mut SessionState, utterance: &str) -> ConfirmationOutcome {
        let Some(pending) = session.pending_confirmation.take() else {
            return ConfirmationOutcome::NotPending { expired: false };
        };

        if pending.requested_at.elapsed() > self.timeout {
            info!(
                tag = pending.command.intent.tag(),
                "pending confirmation expired"
            );
            return ConfirmationOutcome::NotPending { expired: true };
        }

        let text = utterance.trim().to_lowercase();
        if CONFIRM_PHRASES.iter().any(|p| text.contains(p)) {
            info!(tag = pending.command.intent.tag(), "action confirmed");
            return ConfirmationOutcome::Confirmed(pending.command);
        }
        if CANCEL_PHRASES.iter().any(|p| text.contains(p)) {
            info!(tag = pending.command.intent.tag(), "action cancelled");
            return ConfirmationOutcome::Cancelled;
        }

        let prompt = prompt_for(&pending.command);
        session.pending_confirmation = Some(pending);
        ConfirmationOutcome::Reprompt { prompt }
    }
}

/// Spoken confirmation prompt for a parked command.
fn prompt_for(command: &StructuredCommand) -> String {
    use crate::command::Intent;
    let subject = match &command.intent {
        Intent::PowerOff => "вимкнути комп'ютер",
        Intent::Suspend => "ввести комп'ютер у сон",
        other => {
            return format!(
                "Дія «{}» потребує підтвердження. Скажіть «підтверджую» або «скасувати».",
                command
                    .spoken_reply
                    .as_deref()
                    .unwrap_or_else(|| other.tag())
            );
        }
    };
    format!("Точно {subject}? Скажіть «підтверджую» або «скасувати».")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::command::{Intent, StructuredCommand};

    fn gate() -> SafetyGate {
        SafetyGate::new(Duration::from_secs(30))
    }

    fn session() -> SessionState {
        SessionState::new(10)
    }

    #[test]
    fn safe_commands_pass_through() {
        let mut session = session();
        let decision = gate().submit(&mut session, StructuredCommand::bare(Intent::CurrentTime));
        assert!(matches!(decision, GateDecision::Dispatch(_)));
        assert!(session.pending_confirmation.is_none());
    }

    #[test]
    fn irreversible_command_is_parked_not_dispatched() {
        let mut session = session();
        let decision = gate().submit(&mut session, StructuredCommand::bare(Intent::PowerOff));
        assert!(matches!(decision, GateDecision::AwaitConfirmation { .. }));
        assert!(session.pending_confirmation.is_some());
    }

    #[test]
    fn confirm_releases_exactly_once() {
        let gate = gate();
        let mut session = session();
        gate.submit(&mut session, StructuredCommand::bare(Intent::PowerOff));

        let outcome = gate.resolve(&mut session, "підтверджую");
        match outcome {
            ConfirmationOutcome::Confirmed(cmd) => assert_eq!(cmd.intent, Intent::PowerOff),
            other => panic!("expected confirmation, got {other:?}"),
        }
        // The slot is drained — a second confirm finds nothing.
        assert!(matches!(
            gate.resolve(&mut session, "підтверджую"),
            ConfirmationOutcome::NotPending { expired: false }
        ));
    }

    #[test]
    fn cancel_discards_without_dispatch() {
        let gate = gate();
        let mut session = session();
        gate.submit(&mut session, StructuredCommand::bare(Intent::Suspend));

        assert!(matches!(
            gate.resolve(&mut session, "скасувати"),
            ConfirmationOutcome::Cancelled
        ));
        assert!(session.pending_confirmation.is_none());
    }

    #[test]
    fn stop_also_cancels() {
        let gate = gate();
        let mut session = session();
        gate.submit(&mut session, StructuredCommand::bare(Intent::PowerOff));
        assert!(matches!(
            gate.resolve(&mut session, "стоп"),
            ConfirmationOutcome::Cancelled
        ));
    }

    #[test]
    fn unrelated_utterance_reprompts_and_keeps_pending() {
        let gate = gate();
        let mut session = session();
        gate.submit(&mut session, StructuredCommand::bare(Intent::PowerOff));

        let outcome = gate.resolve(&mut session, "відкрий телеграм");
        assert!(matches!(outcome, ConfirmationOutcome::Reprompt { .. }));
        assert!(session.pending_confirmation.is_some());
    }

    #[test]
    fn second_irreversible_is_ignored_while_pending() {
        let gate = gate();
        let mut session = session();
        gate.submit(&mut session, StructuredCommand::bare(Intent::PowerOff));

        let decision = gate.submit(&mut session, StructuredCommand::bare(Intent::Suspend));
        assert!(matches!(decision, GateDecision::AlreadyPending { .. }));
        // The original command is still the parked one.
        assert_eq!(
            session.pending_confirmation.as_ref().unwrap().command.intent,
            Intent::PowerOff
        );
    }

    #[test]
    fn pending_expires_after_timeout() {
        let gate = SafetyGate::new(Duration::from_millis(0));
        let mut session = session();
        gate.submit(&mut session, StructuredCommand::bare(Intent::PowerOff));

        std::thread::sleep(Duration::from_millis(5));
        let outcome = gate.resolve(&mut session, "підтверджую");
        assert!(matches!(
            outcome,
            ConfirmationOutcome::NotPending { expired: true }
        ));
        assert!(session.pending_confirmation.is_none());
    }

    #[test]
    fn nlu_flagged_command_is_gated_too() {
        let gate = gate();
        let mut session = session();
        let cmd = StructuredCommand {
            intent: Intent::Acknowledge {
                tag: "remote_exec".into(),
            },
            confirmation_required: true,
            spoken_reply: Some("виконати скрипт на сервері".into()),
        };
        let decision = gate.submit(&mut session, cmd);
        match decision {
            GateDecision::AwaitConfirmation { prompt } => {
                assert!(prompt.contains("підтверджую"));
                assert!(prompt.contains("виконати скрипт на сервері"));
            }
            other => panic!("expected await, got {other:?}"),
        }
    }
}
