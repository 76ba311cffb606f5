//! Error types for the petra engine.

/// Top-level error type for the intent resolution and execution engine.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Lexicon document load/save or lookup error.
    #[error("lexicon error: {0}")]
    Lexicon(String),

    /// Language model completion error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Capability (OS action, process control) error.
    #[error("capability error: {0}")]
    Capability(String),

    /// IoT transport error.
    #[error("IoT error: {0}")]
    Iot(String),

    /// Facts memory store error.
    #[error("memory error: {0}")]
    Memory(String),

    /// Notes store error.
    #[error("notes error: {0}")]
    Notes(String),

    /// Pipeline coordination error.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
