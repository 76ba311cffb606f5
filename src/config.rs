//! Configuration types for the assistant engine.
//!
//! Configuration is an explicitly constructed value handed to the
//! components that need it at startup — there is no process-wide config
//! object. Settings live in `petra.toml` under the root directory; the
//! lexicon document is a separate JSON file (see [`crate::lexicon`]).

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Turn-loop and session settings.
    pub engine: EngineConfig,
    /// Fallback stage selection.
    pub fallback: FallbackConfig,
    /// Completion endpoint settings (NLU and chat).
    pub llm: LlmConfig,
    /// Wake-word gating of recognized speech.
    pub wake: WakeConfig,
}

/// Turn-loop and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many turns the rolling history keeps.
    pub history_capacity: usize,
    /// Seconds before a pending confirmation expires.
    pub confirmation_timeout_secs: u64,
    /// Delay inserted between automation-sequence steps, in milliseconds.
    pub step_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            confirmation_timeout_secs: 30,
            step_delay_ms: 500,
        }
    }
}

/// Which fallback strategy runs when the fast matcher finds nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Offline string-similarity matching against the command vocabulary.
    #[default]
    Fuzzy,
    /// LLM-based NLU returning structured commands.
    Nlu,
}

/// Fallback stage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub mode: FallbackMode,
}

/// Completion endpoint settings.
///
/// Any server implementing the OpenAI chat completions API works
/// (LM Studio, Ollama, llama.cpp server, a cloud gateway).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the completion server.
    pub base_url: String,
    /// Model name passed through to the server.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1234".to_owned(),
            model: "phi-3.5-mini-instruct".to_owned(),
            timeout_secs: 20,
            temperature: 0.2,
        }
    }
}

/// Wake-word gating applied to recognized speech before processing.
///
/// A recognized utterance is processed when it names the assistant, or when
/// the conversation is still "hot" (a previous exchange happened within the
/// active window). Manual text input bypasses the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    pub enabled: bool,
    /// Names the assistant answers to; a leading alias is stripped.
    pub aliases: Vec<String>,
    /// Seconds after an exchange during which no alias is required.
    pub active_window_secs: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            aliases: vec![
                "петро".to_owned(),
                "петруча".to_owned(),
                "асистент".to_owned(),
            ],
            active_window_secs: 15,
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file, or return defaults when the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| AssistantError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Persist configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| AssistantError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// Returns the root data directory (`~/.petra`, or a temp fallback when no
/// home directory is available).
#[must_use]
pub fn default_root_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".petra"))
        .unwrap_or_else(|| std::env::temp_dir().join(".petra"))
}

/// Default path of the settings file.
#[must_use]
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join("petra.toml")
}

/// Default path of the lexicon JSON document.
#[must_use]
pub fn default_lexicon_path(root: &Path) -> PathBuf {
    root.join("lexicon.json")
}

/// Default directory for notes sessions.
#[must_use]
pub fn default_notes_dir(root: &Path) -> PathBuf {
    root.join("notes")
}

/// Default path of the facts memory database.
#[must_use]
pub fn default_memory_path(root: &Path) -> PathBuf {
    root.join("memory.db")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AssistantConfig::default();
        assert_eq!(config.engine.history_capacity, 10);
        assert_eq!(config.engine.confirmation_timeout_secs, 30);
        assert_eq!(config.fallback.mode, FallbackMode::Fuzzy);
        assert!(config.wake.enabled);
        assert!(config.wake.aliases.contains(&"петро".to_owned()));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssistantConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.llm.base_url, "http://127.0.0.1:1234");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("petra.toml");
        std::fs::write(
            &path,
            r#"
[fallback]
mode = "nlu"

[llm]
base_url = "http://127.0.0.1:11434"
"#,
        )
        .unwrap();

        let config = AssistantConfig::load_or_default(&path).unwrap();
        assert_eq!(config.fallback.mode, FallbackMode::Nlu);
        assert_eq!(config.llm.base_url, "http://127.0.0.1:11434");
        // Untouched sections keep their defaults.
        assert_eq!(config.llm.model, "phi-3.5-mini-instruct");
        assert_eq!(config.engine.step_delay_ms, 500);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("petra.toml");

        let mut config = AssistantConfig::default();
        config.engine.history_capacity = 6;
        config.wake.enabled = false;
        config.save(&path).unwrap();

        let loaded = AssistantConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.engine.history_capacity, 6);
        assert!(!loaded.wake.enabled);
    }
}
