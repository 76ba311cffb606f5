//! The lexicon: user-configured entries, automation sequences and IoT
//! devices, each tagged with voice phrases.
//!
//! The lexicon is persisted as a single JSON document with stable top-level
//! keys (`entries`, `workspaces`, `iot_devices`). Older documents that use
//! the `apps` key for entries are accepted. The engine treats the lexicon as
//! read-only; edits go through [`Lexicon::save`] from a settings surface.

use crate::command::WindowAction;
use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a launchable entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    App,
    File,
    Folder,
    Website,
}

/// A launchable target: an application, file, folder or website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconEntry {
    /// Unique id within the entries collection.
    pub id: String,
    /// Human-readable name used in spoken replies.
    #[serde(alias = "name")]
    pub display_name: String,
    /// Target kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Path or URL the entry points at.
    #[serde(alias = "path", alias = "path_or_url")]
    pub target: String,
    /// Phrases that name this entry in speech.
    #[serde(default, alias = "voice_names")]
    pub voice_phrases: Vec<String>,
}

/// One step of an automation sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Step {
    /// Open a lexicon entry by id.
    #[serde(rename = "OPEN_ENTRY")]
    OpenEntry {
        #[serde(alias = "target_id")]
        entry_id: String,
    },
    /// Close an application entry by id.
    #[serde(rename = "CLOSE_APP")]
    CloseApp {
        #[serde(alias = "target_id", alias = "app_id")]
        entry_id: String,
    },
    /// Open a raw URL in the browser.
    #[serde(rename = "OPEN_WEBSITE")]
    OpenWebsite { url: String },
    /// Window management action.
    #[serde(rename = "WINDOW")]
    Window {
        #[serde(rename = "subaction")]
        action: WindowAction,
    },
    /// Pause between steps.
    #[serde(rename = "WAIT")]
    Wait { seconds: u64 },
    /// Trigger an IoT action.
    #[serde(rename = "IOT")]
    Iot {
        device_id: String,
        action_name: String,
        #[serde(default)]
        value: Option<i64>,
    },
}

/// A named automation sequence ("workspace" in the settings UI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationSequence {
    pub id: String,
    #[serde(alias = "name")]
    pub display_name: String,
    /// Phrases that trigger this sequence anywhere in an utterance.
    #[serde(default, alias = "voice_names")]
    pub voice_phrases: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// How an IoT device is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "connection_type", content = "connection_params")]
pub enum Connection {
    #[serde(rename = "HTTP")]
    Http {
        url: String,
        #[serde(default = "default_http_method")]
        method: String,
    },
    #[serde(rename = "MQTT")]
    Mqtt { broker: String, topic: String },
    #[serde(rename = "Serial")]
    Serial {
        port: String,
        #[serde(default = "default_baud", alias = "baudrate")]
        baud: u32,
    },
}

fn default_http_method() -> String {
    "GET".to_owned()
}

fn default_baud() -> u32 {
    9600
}

/// A voice-triggered action a device supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IotAction {
    pub name: String,
    #[serde(default)]
    pub voice_phrases: Vec<String>,
    /// Outbound payload; a `{value}` placeholder is substituted from the
    /// numeric argument extracted from the utterance.
    #[serde(default, alias = "payload")]
    pub payload_template: String,
}

/// A configured IoT device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IotDevice {
    pub id: String,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(flatten)]
    pub connection: Connection,
    #[serde(default)]
    pub actions: Vec<IotAction>,
}

/// The full user-configured lexicon.
///
/// Collections keep their document order; the matcher's first-registered-wins
/// tie-break depends on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    #[serde(alias = "apps")]
    pub entries: Vec<LexiconEntry>,
    #[serde(rename = "workspaces")]
    pub sequences: Vec<AutomationSequence>,
    pub iot_devices: Vec<IotDevice>,
}

impl Lexicon {
    /// Load the lexicon document from `path`. A missing file yields an
    /// empty lexicon, matching a fresh install.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            AssistantError::Lexicon(format!("invalid lexicon document {}: {e}", path.display()))
        })
    }

    /// Persist the lexicon document to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| AssistantError::Lexicon(format!("failed to serialize lexicon: {e}")))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&LexiconEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Look up an automation sequence by id.
    #[must_use]
    pub fn sequence(&self, id: &str) -> Option<&AutomationSequence> {
        self.sequences.iter().find(|s| s.id == id)
    }

    /// Look up an IoT device by id.
    #[must_use]
    pub fn device(&self, id: &str) -> Option<&IotDevice> {
        self.iot_devices.iter().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn sample_document() -> &'static str {
        r#"{
            "entries": [
                {
                    "id": "telegram",
                    "display_name": "Телеграм",
                    "type": "app",
                    "target": "/usr/bin/telegram-desktop",
                    "voice_phrases": ["телеграм", "телегу"]
                },
                {
                    "id": "uni",
                    "display_name": "Сайт університету",
                    "type": "website",
                    "target": "https://lnu.edu.ua",
                    "voice_phrases": ["університет"]
                }
            ],
            "workspaces": [
                {
                    "id": "work",
                    "display_name": "Робочий режим",
                    "voice_phrases": ["робочий режим"],
                    "steps": [
                        {"action": "OPEN_ENTRY", "entry_id": "telegram"},
                        {"action": "WAIT", "seconds": 2},
                        {"action": "WINDOW", "subaction": "minimize_all"}
                    ]
                }
            ],
            "iot_devices": [
                {
                    "id": "lamp",
                    "display_name": "Лампа",
                    "connection_type": "HTTP",
                    "connection_params": {"url": "http://192.168.0.50/cmd"},
                    "actions": [
                        {
                            "name": "on",
                            "voice_phrases": ["увімкни світло"],
                            "payload_template": "state=on&level={value}"
                        }
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn parses_document_with_stable_keys() {
        let lexicon: Lexicon = serde_json::from_str(sample_document()).unwrap();
        assert_eq!(lexicon.entries.len(), 2);
        assert_eq!(lexicon.sequences.len(), 1);
        assert_eq!(lexicon.iot_devices.len(), 1);
        assert_eq!(lexicon.entry("telegram").unwrap().kind, EntryKind::App);
        assert!(matches!(
            lexicon.sequences[0].steps[2],
            Step::Window {
                action: WindowAction::MinimizeAll
            }
        ));
    }

    #[test]
    fn accepts_legacy_apps_key_and_field_aliases() {
        let doc = r#"{
            "apps": [
                {
                    "id": "steam",
                    "name": "Steam",
                    "type": "app",
                    "path": "C:\\Steam\\steam.exe",
                    "voice_names": ["стім"]
                }
            ]
        }"#;
        let lexicon: Lexicon = serde_json::from_str(doc).unwrap();
        assert_eq!(lexicon.entries.len(), 1);
        let entry = lexicon.entry("steam").unwrap();
        assert_eq!(entry.display_name, "Steam");
        assert_eq!(entry.voice_phrases, vec!["стім".to_owned()]);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lexicon = Lexicon::load(&dir.path().join("absent.json")).unwrap();
        assert!(lexicon.entries.is_empty());
        assert!(lexicon.sequences.is_empty());
    }

    #[test]
    fn save_load_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.json");

        let lexicon = Lexicon {
            entries: vec![
                LexiconEntry {
                    id: "b".into(),
                    display_name: "B".into(),
                    kind: EntryKind::Folder,
                    target: "/tmp/b".into(),
                    voice_phrases: vec!["бе".into()],
                },
                LexiconEntry {
                    id: "a".into(),
                    display_name: "A".into(),
                    kind: EntryKind::File,
                    target: "/tmp/a.txt".into(),
                    voice_phrases: vec!["а".into()],
                },
            ],
            sequences: Vec::new(),
            iot_devices: Vec::new(),
        };
        lexicon.save(&path).unwrap();

        let loaded = Lexicon::load(&path).unwrap();
        let ids: Vec<&str> = loaded.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn serial_connection_defaults_baud() {
        let doc = r#"{
            "iot_devices": [
                {
                    "id": "relay",
                    "display_name": "Реле",
                    "connection_type": "Serial",
                    "connection_params": {"port": "COM3"},
                    "actions": []
                }
            ]
        }"#;
        let lexicon: Lexicon = serde_json::from_str(doc).unwrap();
        match &lexicon.iot_devices[0].connection {
            Connection::Serial { port, baud } => {
                assert_eq!(port, "COM3");
                assert_eq!(*baud, 9600);
            }
            other => panic!("expected serial connection, got {other:?}"),
        }
    }
}
