//! Per-turn orchestration: utterance in, spoken replies out.
//!
//! One utterance flows through: pending-confirmation check → fast matcher
//! → notes recording mode → fallback → safety gate → dispatcher.
//! The engine owns the session state and is driven by a single worker, so
//! no locking is needed anywhere on this path. Nothing here can fail the
//! turn loop: every failure becomes a reply string.

use crate::capability::CompletionBackend;
use crate::command::StructuredCommand;
use crate::config::AssistantConfig;
use crate::dispatcher::Dispatcher;
use crate::fallback::Fallback;
use crate::gate::{ConfirmationOutcome, GateDecision, SafetyGate};
use crate::lexicon::Lexicon;
use crate::matcher;
use crate::memory::FactStore;
use crate::session::SessionState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Reply when neither matching stage produced anything usable.
const DID_NOT_UNDERSTAND: &str = "Не зрозумів, повторіть, будь ласка.";

/// Reply after a cancelled confirmation.
const CANCELLED_REPLY: &str = "Скасовано.";

/// Reply when a pending confirmation timed out before this turn.
const CONFIRMATION_EXPIRED_REPLY: &str = "Час підтвердження минув, дію скасовано.";

/// The intent resolution and execution engine.
pub struct Engine {
    lexicon: Lexicon,
    fallback: Fallback,
    gate: SafetyGate,
    dispatcher: Dispatcher,
    session: SessionState,
    facts: Arc<FactStore>,
    chat_backend: Option<Arc<dyn CompletionBackend>>,
}

impl Engine {
    /// Build an engine. The gate always starts idle — pending confirmations
    /// never survive a restart.
    pub fn new(
        config: &AssistantConfig,
        lexicon: Lexicon,
        fallback: Fallback,
        dispatcher: Dispatcher,
        facts: Arc<FactStore>,
    ) -> Self {
        Self {
            lexicon,
            fallback,
            gate: SafetyGate::new(Duration::from_secs(config.engine.confirmation_timeout_secs)),
            dispatcher,
            session: SessionState::new(config.engine.history_capacity),
            facts,
            chat_backend: None,
        }
    }

    /// Attach a completion backend for free-form chat after an
    /// unsuccessful NLU interpretation.
    #[must_use]
    pub fn with_chat_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.chat_backend = Some(backend);
        self
    }

    /// Read-only view of the session, for frontends.
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Resolve an utterance into commands without executing anything.
    ///
    /// Fast matcher first; its single command wins outright. Otherwise the
    /// configured fallback may return several commands, in order.
    pub async fn resolve_commands(&self, text: &str) -> Vec<StructuredCommand> {
        if let Some(command) = matcher::match_utterance(text, &self.lexicon) {
            return vec![command];
        }
        self.fallback.interpret(text).await
    }

    /// Process one utterance and return the replies to speak, in order.
    ///
    /// Empty input (recognition noise) produces no replies at all.
    pub async fn process_utterance(&mut self, raw: &str) -> Vec<String> {
        let text = raw.trim();
        if text.is_empty() {
            return Vec::new();
        }

        self.session.touch();
        let mut replies: Vec<String> = Vec::new();

        // A pending confirmation owns the turn: the utterance is only a
        // confirm/cancel answer, never an unrelated command.
        match self.gate.resolve(&mut self.session, text) {
            ConfirmationOutcome::Confirmed(command) => {
                self.session.push_user(text);
                let outcome = self
                    .dispatcher
                    .execute(&self.lexicon, &mut self.session, command)
                    .await;
                self.finish_turn(&mut replies, outcome.spoken_reply);
                return replies;
            }
            ConfirmationOutcome::Cancelled => {
                self.session.push_user(text);
                self.finish_turn(&mut replies, CANCELLED_REPLY.to_owned());
                return replies;
            }
            ConfirmationOutcome::Reprompt { prompt } => {
                self.session.push_user(text);
                self.finish_turn(&mut replies, prompt);
                return replies;
            }
            ConfirmationOutcome::NotPending { expired } => {
                if expired {
                    self.finish_turn(&mut replies, CONFIRMATION_EXPIRED_REPLY.to_owned());
                    // The utterance itself still gets processed below.
                }
            }
        }

        self.session.push_user(text);

        // Fast deterministic stage.
        if let Some(command) = matcher::match_utterance(text, &self.lexicon) {
            debug!(tag = command.intent.tag(), "fast match");
            let reply = self.route(command).await;
            self.finish_turn(&mut replies, reply);
            return replies;
        }

        // Active notes session: record instead of interpreting. Checked
        // after the fast matcher so "заверши запис нотаток" still works.
        if let Some(note) = self.session.notes_session.clone() {
            if let Err(e) = self.dispatcher.notes().append(&note, text) {
                warn!(error = %e, "cannot append to active note");
                self.finish_turn(&mut replies, "Не вдалося записати нотатку.".to_owned());
            }
            return replies;
        }

        // Fallback stage.
        let commands = self.fallback.interpret(text).await;
        if commands.is_empty() {
            let reply = self.chat_or_fallback_reply(text).await;
            self.finish_turn(&mut replies, reply);
            return replies;
        }

        let mut handled_any = false;
        for command in commands {
            let outcome_reply = self.route_with_tracking(command, &mut handled_any).await;
            self.finish_turn(&mut replies, outcome_reply);
        }
        if !handled_any {
            // Every command fell through; give the chat fallback a chance
            // to answer instead of leaving only "cannot do that".
            if self.fallback.supports_chat() && self.chat_backend.is_some() {
                let reply = self.chat_or_fallback_reply(text).await;
                self.finish_turn(&mut replies, reply);
            }
        }
        replies
    }

    /// Route one command through the gate into the dispatcher.
    async fn route(&mut self, command: StructuredCommand) -> String {
        let mut handled = false;
        self.route_with_tracking(command, &mut handled).await
    }

    async fn route_with_tracking(
        &mut self,
        command: StructuredCommand,
        handled_any: &mut bool,
    ) -> String {
        match self.gate.submit(&mut self.session, command) {
            GateDecision::Dispatch(command) => {
                let outcome = self
                    .dispatcher
                    .execute(&self.lexicon, &mut self.session, command)
                    .await;
                *handled_any |= outcome.handled;
                outcome.spoken_reply
            }
            GateDecision::AwaitConfirmation { prompt }
            | GateDecision::AlreadyPending { prompt } => {
                *handled_any = true;
                prompt
            }
        }
    }

    /// Free chat against the completion backend, with memory facts and the
    /// rolling history as context. Falls back to the fixed "didn't
    /// understand" reply when chat is unavailable or fails.
    async fn chat_or_fallback_reply(&self, text: &str) -> String {
        let Some(backend) = self.chat_backend.as_ref().filter(|_| self.fallback.supports_chat())
        else {
            return DID_NOT_UNDERSTAND.to_owned();
        };

        let facts = self.facts.search(text, 3).unwrap_or_default();
        let mut system_prompt = String::from(
            "Ти україномовний голосовий асистент Петруча. Відповідай коротко, \
             живою мовою, без JSON і без розмітки.\n",
        );
        if !facts.is_empty() {
            system_prompt.push_str("Відомі факти про користувача:\n");
            for fact in &facts {
                system_prompt.push_str("- ");
                system_prompt.push_str(fact);
                system_prompt.push('\n');
            }
        }
        let history = self.session.context_window();
        if !history.is_empty() {
            system_prompt.push_str("Історія діалогу:\n");
            system_prompt.push_str(&history);
        }

        match backend.complete(&system_prompt, text).await {
            Ok(Some(reply)) if !reply.trim().is_empty() => reply.trim().to_owned(),
            Ok(_) => DID_NOT_UNDERSTAND.to_owned(),
            Err(e) => {
                info!(error = %e, "chat fallback failed");
                DID_NOT_UNDERSTAND.to_owned()
            }
        }
    }

    fn finish_turn(&mut self, replies: &mut Vec<String>, reply: String) {
        if reply.is_empty() {
            return;
        }
        self.session.push_assistant(reply.clone());
        replies.push(reply);
    }
}
