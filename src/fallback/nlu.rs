//! LLM-based NLU fallback.
//!
//! The completion capability receives the raw ASR text plus a fixed system
//! instruction demanding strictly valid JSON:
//!
//! ```json
//! {"commands": [{"intent": "...", "confirmation_required": false, "answer_uk": "..."}]}
//! ```
//!
//! The response is parsed defensively: fenced code blocks are stripped, the
//! first JSON object is extracted, and anything malformed — invalid JSON, a
//! missing or non-array `commands` field, items without an intent — yields
//! an empty result with a logged warning. The turn loop never sees an error
//! from this module.

use crate::capability::CompletionBackend;
use crate::command::{Intent, StructuredCommand, WindowAction};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fixed system instruction for the NLU contract.
pub const NLU_SYSTEM_PROMPT: &str = r#"Ти – NLU-модуль україномовного голосового асистента. Отримуєш текст від системи розпізнавання мовлення (може містити суржик, русизми, помилки). Поверни суворо валідний JSON без жодного тексту поза ним:

{
  "commands": [
    {
      "intent": "OPEN_ENTRY" | "CLOSE_APP" | "RUN_WORKSPACE" | "IOT_ACTION" | "WINDOW_MANAGEMENT" | "START_TIMER" | "STOP_TIMER" | "START_NOTES_SESSION" | "STOP_NOTES_SESSION" | "ANALYZE_NOTES" | "REMEMBER_FACT" | "CLEAR_MEMORY" | "CURRENT_TIME" | "POWER_OFF" | "SUSPEND" | "turn_on" | "turn_off" | "smalltalk" | "ask_clarification" | "unknown",
      "params": { "entry_id": string?, "workspace_id": string?, "device_id": string?, "action_name": string?, "value": number?, "minutes": number?, "text": string? },
      "confirmation_required": boolean,
      "answer_uk": string
    }
  ]
}

Правила:
1. Жодного тексту поза JSON. Markdown-блоки ``` небажані, але JSON всередині має бути валідний.
2. Не вигадуй ідентифікаторів. Якщо команда не стосується відомих intent-ів – використовуй "smalltalk", "ask_clarification" або "unknown" і сформулюй відповідь у answer_uk.
3. Небезпечні дії (вимкнення, виконання команд з правами) – confirmation_required=true.
4. Кілька команд за один запит дозволені: масив commands може містити 1+ обʼєктів, у порядку виконання.
"#;

/// LLM-backed interpreter.
pub struct NluInterpreter {
    backend: Arc<dyn CompletionBackend>,
}

impl NluInterpreter {
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Access the underlying completion backend (shared with free chat).
    #[must_use]
    pub fn backend(&self) -> Arc<dyn CompletionBackend> {
        Arc::clone(&self.backend)
    }

    /// Interpret noisy ASR text into structured commands.
    ///
    /// Network errors and malformed output are recoverable: both produce an
    /// empty list.
    pub async fn interpret(&self, utterance: &str) -> Vec<StructuredCommand> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Vec::new();
        }

        let user_message = format!(
            "Це текст, який розпізнала система ASR (може містити помилки):\n{utterance}\nВиділи з нього структуровані команди й поверни JSON згідно зі схемою."
        );

        let raw = match self.backend.complete(NLU_SYSTEM_PROMPT, &user_message).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("NLU backend returned no content");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "NLU completion failed");
                return Vec::new();
            }
        };

        parse_commands(&raw)
    }
}

/// Parse the raw completion text into validated commands.
///
/// Fails closed: every malformed shape logs and returns an empty list.
#[must_use]
pub fn parse_commands(raw: &str) -> Vec<StructuredCommand> {
    let Some(json_text) = extract_json_block(raw) else {
        warn!("NLU output has no JSON block");
        return Vec::new();
    };

    let value: serde_json::Value = match serde_json::from_str(&json_text) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "NLU output is not valid JSON");
            return Vec::new();
        }
    };

    let Some(items) = value.get("commands").and_then(|c| c.as_array()) else {
        warn!("NLU response does not contain a list of commands");
        return Vec::new();
    };

    let mut commands = Vec::new();
    for item in items {
        match parse_command_item(item) {
            Some(cmd) => commands.push(cmd),
            None => warn!(?item, "skipping invalid command item"),
        }
    }
    debug!(count = commands.len(), "NLU commands parsed");
    commands
}

fn parse_command_item(item: &serde_json::Value) -> Option<StructuredCommand> {
    let tag = item.get("intent")?.as_str()?.trim();
    if tag.is_empty() {
        return None;
    }

    let confirmation_required = item
        .get("confirmation_required")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let spoken_reply = item
        .get("spoken_reply")
        .or_else(|| item.get("answer_uk"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .filter(|s| !s.trim().is_empty());

    let intent = match tag {
        "OPEN_ENTRY" | "OPEN_APP" => Intent::OpenEntry {
            entry_id: string_param(item, &["entry_id", "app_name"])?,
        },
        "CLOSE_APP" => Intent::CloseApp {
            entry_id: string_param(item, &["entry_id", "app_name"])?,
        },
        "RUN_WORKSPACE" | "RUN_SEQUENCE" => Intent::RunSequence {
            sequence_id: string_param(item, &["workspace_id", "sequence_id"])?,
        },
        "IOT_ACTION" => Intent::IotAction {
            device_id: string_param(item, &["device_id"])?,
            action_name: string_param(item, &["action_name"])?,
            value: int_param(item, &["value"]),
        },
        "WINDOW_MANAGEMENT" => Intent::Window {
            action: WindowAction::MinimizeAll,
        },
        "START_TIMER" => Intent::StartTimer {
            minutes: int_param(item, &["minutes"]).and_then(|m| u64::try_from(m).ok())?,
        },
        "STOP_TIMER" => Intent::StopTimer,
        "START_NOTES_SESSION" => Intent::StartNotes,
        "STOP_NOTES_SESSION" => Intent::StopNotes,
        "ANALYZE_NOTES" => Intent::AnalyzeNotes,
        "REMEMBER_FACT" => Intent::RememberFact {
            text: string_param(item, &["text"])?,
        },
        "CLEAR_MEMORY" => Intent::ClearMemory,
        "CURRENT_TIME" => Intent::CurrentTime,
        "POWER_OFF" => Intent::PowerOff,
        "SUSPEND" => Intent::Suspend,
        "unknown" => {
            debug!("NLU reported unknown intent");
            return None;
        }
        // NLU-level intents (turn_on, smalltalk, ask_clarification, …)
        // are handled at the acknowledge level: the spoken reply carries
        // the whole effect.
        other => Intent::Acknowledge {
            tag: other.to_owned(),
        },
    };

    Some(StructuredCommand {
        intent,
        confirmation_required,
        spoken_reply,
    })
}

/// Read a string parameter from `params.{key}` or the flat item.
fn string_param(item: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        let found = item
            .get("params")
            .and_then(|p| p.get(key))
            .or_else(|| item.get(*key))
            .and_then(serde_json::Value::as_str);
        if let Some(value) = found
            && !value.trim().is_empty()
        {
            return Some(value.to_owned());
        }
    }
    None
}

/// Read an integer parameter from `params.{key}` or the flat item.
fn int_param(item: &serde_json::Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        let found = item
            .get("params")
            .and_then(|p| p.get(key))
            .or_else(|| item.get(*key))
            .and_then(serde_json::Value::as_i64);
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Extract a JSON object from raw completion text.
///
/// Handles fenced ```json blocks, bare fences, and prose around a JSON
/// object. Returns `None` when no object is present at all.
#[must_use]
pub fn extract_json_block(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Fenced block first: take the content between the fences.
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip an optional language tag on the fence line.
        let body = after.split_once('\n').map_or(after, |(_, rest)| rest);
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') {
                return Some(inner.to_owned());
            }
        }
    }

    // Otherwise take the outermost `{ … }` span.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(trimmed[start..=end].to_owned())
}
