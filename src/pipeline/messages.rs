//! Message types passed between pipeline stages.

use std::time::Instant;

/// Where an utterance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceSource {
    /// Recognized speech; subject to wake-word gating.
    Speech,
    /// Typed input; bypasses wake-word gating.
    Manual,
}

/// One unit of recognized or typed text entering the engine.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub text: String,
    pub source: UtteranceSource,
    /// Timestamp when the utterance entered the pipeline.
    pub received_at: Instant,
}

impl Utterance {
    #[must_use]
    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: UtteranceSource::Speech,
            received_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn manual(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: UtteranceSource::Manual,
            received_at: Instant::now(),
        }
    }
}

/// Events published to frontends (GUI, console).
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// An utterance was accepted for processing.
    UserText(String),
    /// A reply was produced and queued for speech.
    AssistantText(String),
    /// Microphone level update, 0–100.
    MicLevel(u8),
    /// The pipeline stopped.
    Stopped,
}
