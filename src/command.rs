//! Structured commands produced by the matching stages.
//!
//! Every matching stage (fast matcher, fuzzy fallback, LLM NLU) normalizes
//! its result into a [`StructuredCommand`]: a closed, data-carrying
//! [`Intent`] plus the confirmation flag and an optional canned spoken
//! reply. The dispatcher consumes each command exactly once.

/// Window-management sub-action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAction {
    /// Minimize all windows / show the desktop.
    MinimizeAll,
}

/// A resolved user intent with its parameters.
///
/// The set is closed: anything the assistant cannot name here is either an
/// [`Intent::Acknowledge`] (an NLU-level intent answered with speech only)
/// or no command at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// "Що ти вмієш" — describe capabilities.
    Capabilities,
    /// "Як ти працюєш" — describe the assistant's architecture.
    Architecture,
    /// "Котра година" — speak the current time.
    CurrentTime,
    /// Open a configured lexicon entry (app, file, folder, website).
    OpenEntry { entry_id: String },
    /// Close a configured application.
    CloseApp { entry_id: String },
    /// Run an automation sequence.
    RunSequence { sequence_id: String },
    /// Trigger an IoT device action, with an optional numeric argument.
    IotAction {
        device_id: String,
        action_name: String,
        value: Option<i64>,
    },
    /// Start a focus timer for the given number of minutes.
    StartTimer { minutes: u64 },
    /// Stop the running focus timer.
    StopTimer,
    /// Window management action.
    Window { action: WindowAction },
    /// Start a notes-recording session.
    StartNotes,
    /// End the active notes-recording session.
    StopNotes,
    /// Analyze the latest note with the language model.
    AnalyzeNotes,
    /// Store a fact in long-term memory.
    RememberFact { text: String },
    /// Erase all stored facts.
    ClearMemory,
    /// Shut the computer down. Irreversible — gated behind confirmation.
    PowerOff,
    /// Suspend the computer. Irreversible — gated behind confirmation.
    Suspend,
    /// An NLU intent handled at the acknowledge level only: no capability
    /// call, the spoken reply carries the whole effect.
    Acknowledge { tag: String },
}

impl Intent {
    /// Stable string tag for logging and action journals.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Capabilities => "CAPABILITIES",
            Self::Architecture => "ARCHITECTURE",
            Self::CurrentTime => "CURRENT_TIME",
            Self::OpenEntry { .. } => "OPEN_ENTRY",
            Self::CloseApp { .. } => "CLOSE_APP",
            Self::RunSequence { .. } => "RUN_SEQUENCE",
            Self::IotAction { .. } => "IOT_ACTION",
            Self::StartTimer { .. } => "START_TIMER",
            Self::StopTimer => "STOP_TIMER",
            Self::Window { .. } => "WINDOW_MANAGEMENT",
            Self::StartNotes => "START_NOTES_SESSION",
            Self::StopNotes => "STOP_NOTES_SESSION",
            Self::AnalyzeNotes => "ANALYZE_NOTES",
            Self::RememberFact { .. } => "REMEMBER_FACT",
            Self::ClearMemory => "CLEAR_MEMORY",
            Self::PowerOff => "POWER_OFF",
            Self::Suspend => "SUSPEND",
            Self::Acknowledge { tag } => tag.as_str(),
        }
    }

    /// Intents that destroy state or cut the session short and therefore
    /// always pass through the confirmation gate.
    #[must_use]
    pub fn is_irreversible(&self) -> bool {
        matches!(self, Self::PowerOff | Self::Suspend)
    }
}

/// The normalized unit passed from matching into the gate and dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredCommand {
    /// The resolved intent with its parameters.
    pub intent: Intent,
    /// Whether the source stage flagged this command for confirmation
    /// (the NLU sets this for privileged or ambiguous requests).
    pub confirmation_required: bool,
    /// Optional canned reply supplied by the source stage.
    pub spoken_reply: Option<String>,
}

impl StructuredCommand {
    /// A command with no confirmation flag and no canned reply.
    #[must_use]
    pub fn bare(intent: Intent) -> Self {
        Self {
            intent,
            confirmation_required: false,
            spoken_reply: None,
        }
    }

    /// Whether this command must pass through the confirmation gate.
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        self.confirmation_required || self.intent.is_irreversible()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn tags_are_stable() {
        assert_eq!(
            Intent::OpenEntry {
                entry_id: "telegram".into()
            }
            .tag(),
            "OPEN_ENTRY"
        );
        assert_eq!(Intent::PowerOff.tag(), "POWER_OFF");
        assert_eq!(
            Intent::Acknowledge {
                tag: "turn_on".into()
            }
            .tag(),
            "turn_on"
        );
    }

    #[test]
    fn power_and_suspend_are_irreversible() {
        assert!(Intent::PowerOff.is_irreversible());
        assert!(Intent::Suspend.is_irreversible());
        assert!(!Intent::CurrentTime.is_irreversible());
        assert!(!Intent::StopTimer.is_irreversible());
    }

    #[test]
    fn nlu_flag_forces_confirmation() {
        let mut cmd = StructuredCommand::bare(Intent::Acknowledge {
            tag: "remote_exec".into(),
        });
        assert!(!cmd.needs_confirmation());
        cmd.confirmation_required = true;
        assert!(cmd.needs_confirmation());
    }

    #[test]
    fn irreversible_intent_forces_confirmation() {
        let cmd = StructuredCommand::bare(Intent::Suspend);
        assert!(cmd.needs_confirmation());
    }
}
