//! Fallback intent resolution for utterances the fast matcher rejects.
//!
//! Two interchangeable strategies, selected by configuration:
//!
//! - [`fuzzy`] — offline string-similarity matching against a fixed
//!   command vocabulary.
//! - [`nlu`] — an LLM instructed by a fixed prompt contract to return
//!   structured commands as JSON.
//!
//! Both satisfy the same contract: `interpret(utterance)` returns zero or
//! more [`StructuredCommand`]s, dispatched in order. Failures of any kind
//! (network, malformed output) produce an empty result, never an error —
//! the engine answers with a "didn't understand" reply instead.

pub mod fuzzy;
pub mod nlu;

use crate::command::StructuredCommand;
use fuzzy::FuzzyMatcher;
use nlu::NluInterpreter;

/// The configured fallback strategy.
pub enum Fallback {
    Fuzzy(FuzzyMatcher),
    Nlu(NluInterpreter),
}

impl Fallback {
    /// Interpret an utterance into zero or more structured commands.
    pub async fn interpret(&self, utterance: &str) -> Vec<StructuredCommand> {
        match self {
            Self::Fuzzy(matcher) => matcher.interpret(utterance),
            Self::Nlu(interpreter) => interpreter.interpret(utterance).await,
        }
    }

    /// Whether this fallback can answer free-form chat after an
    /// unsuccessful interpretation.
    #[must_use]
    pub fn supports_chat(&self) -> bool {
        matches!(self, Self::Nlu(_))
    }
}
