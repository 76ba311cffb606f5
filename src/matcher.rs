//! Deterministic, rule-based intent matching.
//!
//! The fast matcher turns an utterance into at most one
//! [`StructuredCommand`] using fixed phrase tables and the lexicon. Rules
//! run in a fixed order and the first match wins — no scoring, no network.
//! Collections are scanned in their stored order, so an ambiguous phrase
//! resolves to whichever entry was registered first.

use crate::command::{Intent, StructuredCommand, WindowAction};
use crate::lexicon::{EntryKind, Lexicon};
use regex::Regex;
use std::sync::LazyLock;

/// Verb aliases that start an open/launch request.
pub(crate) const OPEN_VERBS: [&str; 2] = ["відкрий", "запусти"];

/// Verb aliases that start a close request.
pub(crate) const CLOSE_VERBS: [&str; 2] = ["закрий", "вимкни"];

/// Fixed phrases answered without touching the lexicon. The fuzzy fallback
/// reuses these tables as its command vocabulary.
pub(crate) const CAPABILITY_PHRASES: [&str; 2] = ["що ти вмієш", "твої можливості"];
pub(crate) const ARCHITECTURE_PHRASES: [&str; 3] =
    ["як ти працюєш", "твоя архітектура", "принцип роботи"];
pub(crate) const TIME_PHRASES: [&str; 4] =
    ["котра година", "яка година", "поточний час", "скільки годин"];
pub(crate) const POWER_OFF_PHRASES: [&str; 3] =
    ["вимкни комп'ютер", "вимкни комп", "виключи комп"];
pub(crate) const SUSPEND_PHRASES: [&str; 2] =
    ["введи комп'ютер у сон", "введи комп'ютер в сон"];

static TIMER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:хв|мін)").expect("static timer pattern"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static number pattern"));

/// Extract the first integer literal from the utterance, if any.
#[must_use]
pub fn first_number(text: &str) -> Option<i64> {
    NUMBER_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

/// Match an utterance against the built-in rules and the lexicon.
///
/// Returns `None` when nothing matches; the caller proceeds to the
/// fallback stage.
#[must_use]
pub fn match_utterance(raw: &str, lexicon: &Lexicon) -> Option<StructuredCommand> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    // 1. Fixed built-in phrases.
    if contains_any(&text, &CAPABILITY_PHRASES) {
        return Some(StructuredCommand::bare(Intent::Capabilities));
    }
    if contains_any(&text, &ARCHITECTURE_PHRASES) {
        return Some(StructuredCommand::bare(Intent::Architecture));
    }
    if contains_any(&text, &TIME_PHRASES) {
        return Some(StructuredCommand::bare(Intent::CurrentTime));
    }
    if contains_any(&text, &POWER_OFF_PHRASES) {
        return Some(StructuredCommand::bare(Intent::PowerOff));
    }
    if contains_any(&text, &SUSPEND_PHRASES) {
        return Some(StructuredCommand::bare(Intent::Suspend));
    }

    // 2. Open/launch a lexicon entry.
    if let Some(rest) = strip_verb(&text, &OPEN_VERBS) {
        for entry in &lexicon.entries {
            if entry.voice_phrases.iter().any(|p| rest.contains(p.as_str())) {
                return Some(StructuredCommand::bare(Intent::OpenEntry {
                    entry_id: entry.id.clone(),
                }));
            }
        }
    }

    // 3. Close an application entry.
    if let Some(rest) = strip_verb(&text, &CLOSE_VERBS) {
        for entry in &lexicon.entries {
            if entry.kind == EntryKind::App
                && entry.voice_phrases.iter().any(|p| rest.contains(p.as_str()))
            {
                return Some(StructuredCommand::bare(Intent::CloseApp {
                    entry_id: entry.id.clone(),
                }));
            }
        }
    }

    // 4. Automation sequences match anywhere in the utterance.
    for sequence in &lexicon.sequences {
        if sequence
            .voice_phrases
            .iter()
            .any(|p| text.contains(p.as_str()))
        {
            return Some(StructuredCommand::bare(Intent::RunSequence {
                sequence_id: sequence.id.clone(),
            }));
        }
    }

    // 5. IoT action phrases, with an optional numeric argument.
    for device in &lexicon.iot_devices {
        for action in &device.actions {
            if action
                .voice_phrases
                .iter()
                .any(|p| text.contains(p.as_str()))
            {
                return Some(StructuredCommand::bare(Intent::IotAction {
                    device_id: device.id.clone(),
                    action_name: action.name.clone(),
                    value: first_number(&text),
                }));
            }
        }
    }

    // 6. Timer.
    if text.contains("таймер") || text.contains("засічи") {
        if text.contains("стоп") || text.contains("зупини") {
            return Some(StructuredCommand::bare(Intent::StopTimer));
        }
        if let Some(caps) = TIMER_RE.captures(&text)
            && let Ok(minutes) = caps[1].parse::<u64>()
        {
            return Some(StructuredCommand::bare(Intent::StartTimer { minutes }));
        }
    }

    // 7. Window management.
    if (text.contains("згорни")
        && (text.contains("все") || text.contains("всі") || text.contains("вікна")))
        || text.contains("покажи робочий стіл")
    {
        return Some(StructuredCommand::bare(Intent::Window {
            action: WindowAction::MinimizeAll,
        }));
    }

    // 8. Notes sessions.
    if (text.contains("створи") || text.contains("почни"))
        && (text.contains("нотатк") || text.contains("запис"))
    {
        return Some(StructuredCommand::bare(Intent::StartNotes));
    }
    if (text.contains("зупини") || text.contains("заверши"))
        && (text.contains("нотатк") || text.contains("запис"))
    {
        return Some(StructuredCommand::bare(Intent::StopNotes));
    }
    if text.contains("проаналізуй") && text.contains("нотатк") {
        return Some(StructuredCommand::bare(Intent::AnalyzeNotes));
    }

    // 9. Long-term memory.
    if text.contains("запам'ятай") {
        return Some(StructuredCommand::bare(Intent::RememberFact {
            text: text.clone(),
        }));
    }
    if text.contains("очисти") && text.contains("пам'ят") {
        return Some(StructuredCommand::bare(Intent::ClearMemory));
    }

    None
}

/// If the utterance starts with one of the verbs, return the remainder.
fn strip_verb<'a>(text: &'a str, verbs: &[&str]) -> Option<&'a str> {
    for verb in verbs {
        if let Some(rest) = text.strip_prefix(verb) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Some(rest);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::lexicon::{AutomationSequence, Connection, IotAction, IotDevice, LexiconEntry};

    fn lexicon() -> Lexicon {
        Lexicon {
            entries: vec![
                LexiconEntry {
                    id: "telegram".into(),
                    display_name: "Телеграм".into(),
                    kind: EntryKind::App,
                    target: "/usr/bin/telegram-desktop".into(),
                    voice_phrases: vec!["телеграм".into(), "телегу".into()],
                },
                LexiconEntry {
                    id: "telegram_web".into(),
                    display_name: "Телеграм веб".into(),
                    kind: EntryKind::Website,
                    target: "https://web.telegram.org".into(),
                    voice_phrases: vec!["телеграм".into()],
                },
                LexiconEntry {
                    id: "docs".into(),
                    display_name: "Документи".into(),
                    kind: EntryKind::Folder,
                    target: "/home/user/Documents".into(),
                    voice_phrases: vec!["документи".into()],
                },
            ],
            sequences: vec![AutomationSequence {
                id: "work".into(),
                display_name: "Робочий режим".into(),
                voice_phrases: vec!["робочий режим".into()],
                steps: Vec::new(),
            }],
            iot_devices: vec![IotDevice {
                id: "lamp".into(),
                display_name: "Лампа".into(),
                connection: Connection::Http {
                    url: "http://192.168.0.50/cmd".into(),
                    method: "GET".into(),
                },
                actions: vec![IotAction {
                    name: "brightness".into(),
                    voice_phrases: vec!["яскравість".into()],
                    payload_template: "level={value}".into(),
                }],
            }],
        }
    }

    #[test]
    fn open_verb_plus_phrase_matches_entry() {
        let cmd = match_utterance("Відкрий телеграм", &lexicon()).unwrap();
        assert_eq!(
            cmd.intent,
            Intent::OpenEntry {
                entry_id: "telegram".into()
            }
        );
    }

    #[test]
    fn ambiguous_phrase_resolves_to_first_registered_entry() {
        // Both "telegram" and "telegram_web" carry the phrase "телеграм";
        // the one stored first wins, every time.
        let lex = lexicon();
        for _ in 0..5 {
            let cmd = match_utterance("запусти телеграм", &lex).unwrap();
            assert_eq!(
                cmd.intent,
                Intent::OpenEntry {
                    entry_id: "telegram".into()
                }
            );
        }
    }

    #[test]
    fn close_matches_apps_only() {
        let cmd = match_utterance("закрий телеграм", &lexicon()).unwrap();
        assert_eq!(
            cmd.intent,
            Intent::CloseApp {
                entry_id: "telegram".into()
            }
        );
        // "документи" is a folder — no close command for it.
        assert!(match_utterance("закрий документи", &lexicon()).is_none());
    }

    #[test]
    fn bare_verb_matches_nothing() {
        assert!(match_utterance("відкрий", &lexicon()).is_none());
        assert!(match_utterance("відкрий   ", &lexicon()).is_none());
    }

    #[test]
    fn sequence_phrase_matches_anywhere() {
        let cmd = match_utterance("увімкни мені робочий режим будь ласка", &lexicon()).unwrap();
        assert_eq!(
            cmd.intent,
            Intent::RunSequence {
                sequence_id: "work".into()
            }
        );
    }

    #[test]
    fn iot_phrase_extracts_numeric_value() {
        let cmd = match_utterance("постав яскравість на 40", &lexicon()).unwrap();
        assert_eq!(
            cmd.intent,
            Intent::IotAction {
                device_id: "lamp".into(),
                action_name: "brightness".into(),
                value: Some(40),
            }
        );
    }

    #[test]
    fn iot_phrase_without_number_has_no_value() {
        let cmd = match_utterance("яскравість максимум", &lexicon()).unwrap();
        assert!(matches!(
            cmd.intent,
            Intent::IotAction { value: None, .. }
        ));
    }

    #[test]
    fn timer_start_and_stop() {
        let cmd = match_utterance("засічи таймер на 15 хв", &lexicon()).unwrap();
        assert_eq!(cmd.intent, Intent::StartTimer { minutes: 15 });

        let cmd = match_utterance("стоп таймер", &lexicon()).unwrap();
        assert_eq!(cmd.intent, Intent::StopTimer);
    }

    #[test]
    fn timer_without_duration_is_no_match() {
        assert!(match_utterance("постав таймер", &lexicon()).is_none());
    }

    #[test]
    fn window_management_phrases() {
        for utterance in ["згорни всі вікна", "згорни все", "покажи робочий стіл"] {
            let cmd = match_utterance(utterance, &lexicon()).unwrap();
            assert_eq!(
                cmd.intent,
                Intent::Window {
                    action: WindowAction::MinimizeAll
                }
            );
        }
    }

    #[test]
    fn notes_session_phrases() {
        assert_eq!(
            match_utterance("почни запис нотаток", &lexicon())
                .unwrap()
                .intent,
            Intent::StartNotes
        );
        assert_eq!(
            match_utterance("заверши нотатки", &lexicon()).unwrap().intent,
            Intent::StopNotes
        );
        assert_eq!(
            match_utterance("проаналізуй нотатки", &lexicon())
                .unwrap()
                .intent,
            Intent::AnalyzeNotes
        );
    }

    #[test]
    fn memory_phrases() {
        let cmd = match_utterance("запам'ятай що пароль у шухляді", &lexicon()).unwrap();
        assert!(matches!(cmd.intent, Intent::RememberFact { .. }));

        assert_eq!(
            match_utterance("очисти пам'ять", &lexicon()).unwrap().intent,
            Intent::ClearMemory
        );
    }

    #[test]
    fn builtin_phrases_win_before_lexicon() {
        assert_eq!(
            match_utterance("що ти вмієш", &lexicon()).unwrap().intent,
            Intent::Capabilities
        );
        assert_eq!(
            match_utterance("котра година", &lexicon()).unwrap().intent,
            Intent::CurrentTime
        );
        // "вимкни комп'ютер" is a close verb too, but the power-off
        // built-in is checked first.
        assert_eq!(
            match_utterance("вимкни комп'ютер", &lexicon()).unwrap().intent,
            Intent::PowerOff
        );
    }

    #[test]
    fn noise_and_unknown_yield_none() {
        assert!(match_utterance("", &lexicon()).is_none());
        assert!(match_utterance("   ", &lexicon()).is_none());
        assert!(match_utterance("бла бла бла", &lexicon()).is_none());
    }

    #[test]
    fn matching_is_deterministic_across_calls() {
        let lex = lexicon();
        let first = match_utterance("відкрий телеграм", &lex);
        let second = match_utterance("відкрий телеграм", &lex);
        assert_eq!(first, second);
    }
}
