//! String-similarity fallback over a fixed command vocabulary.
//!
//! The vocabulary is a flat list of `(phrase, intent)` pairs built from the
//! same tables the fast matcher uses plus the lexicon's voice phrases. The
//! cleaned utterance is scored against every phrase with a normalized
//! Levenshtein ratio on the 0–100 scale; the best-scoring phrase wins, but
//! only at or above the fixed acceptance threshold. Below it the fallback
//! reports nothing and the engine answers "didn't understand".

use crate::command::{Intent, StructuredCommand, WindowAction};
use crate::lexicon::Lexicon;
use crate::matcher;
use tracing::debug;

/// Minimum similarity score (0–100) for a fuzzy match to be accepted.
pub const FUZZY_THRESHOLD: u8 = 80;

/// Offline fuzzy matcher.
pub struct FuzzyMatcher {
    vocabulary: Vec<(String, Intent)>,
}

impl FuzzyMatcher {
    /// Build the vocabulary from the built-in phrase tables and the
    /// lexicon. Phrase order follows registration order, so equal scores
    /// resolve to the earliest phrase.
    #[must_use]
    pub fn from_lexicon(lexicon: &Lexicon) -> Self {
        let mut vocabulary: Vec<(String, Intent)> = Vec::new();

        for phrase in matcher::TIME_PHRASES {
            vocabulary.push((phrase.to_owned(), Intent::CurrentTime));
        }
        for phrase in matcher::CAPABILITY_PHRASES {
            vocabulary.push((phrase.to_owned(), Intent::Capabilities));
        }
        for phrase in matcher::ARCHITECTURE_PHRASES {
            vocabulary.push((phrase.to_owned(), Intent::Architecture));
        }
        for phrase in matcher::POWER_OFF_PHRASES {
            vocabulary.push((phrase.to_owned(), Intent::PowerOff));
        }
        for phrase in matcher::SUSPEND_PHRASES {
            vocabulary.push((phrase.to_owned(), Intent::Suspend));
        }
        vocabulary.push((
            "згорни всі вікна".to_owned(),
            Intent::Window {
                action: WindowAction::MinimizeAll,
            },
        ));
        vocabulary.push((
            "покажи робочий стіл".to_owned(),
            Intent::Window {
                action: WindowAction::MinimizeAll,
            },
        ));
        vocabulary.push(("почни запис нотаток".to_owned(), Intent::StartNotes));
        vocabulary.push(("заверши запис нотаток".to_owned(), Intent::StopNotes));
        vocabulary.push(("проаналізуй нотатки".to_owned(), Intent::AnalyzeNotes));
        vocabulary.push(("очисти пам'ять".to_owned(), Intent::ClearMemory));

        for entry in &lexicon.entries {
            for phrase in &entry.voice_phrases {
                for verb in matcher::OPEN_VERBS {
                    vocabulary.push((
                        format!("{verb} {phrase}"),
                        Intent::OpenEntry {
                            entry_id: entry.id.clone(),
                        },
                    ));
                }
            }
        }
        for sequence in &lexicon.sequences {
            for phrase in &sequence.voice_phrases {
                vocabulary.push((
                    phrase.clone(),
                    Intent::RunSequence {
                        sequence_id: sequence.id.clone(),
                    },
                ));
            }
        }
        for device in &lexicon.iot_devices {
            for action in &device.actions {
                for phrase in &action.voice_phrases {
                    vocabulary.push((
                        phrase.clone(),
                        Intent::IotAction {
                            device_id: device.id.clone(),
                            action_name: action.name.clone(),
                            value: None,
                        },
                    ));
                }
            }
        }

        Self { vocabulary }
    }

    /// Number of phrases in the vocabulary.
    #[must_use]
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Interpret an utterance. Returns one command when the best phrase
    /// scores at or above [`FUZZY_THRESHOLD`], otherwise an empty list.
    #[must_use]
    pub fn interpret(&self, utterance: &str) -> Vec<StructuredCommand> {
        let text = utterance.trim().to_lowercase();
        if text.is_empty() {
            return Vec::new();
        }

        let mut best: Option<(&Intent, u8)> = None;
        for (phrase, intent) in &self.vocabulary {
            let score = similarity_ratio(&text, phrase);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((intent, score));
            }
        }

        match best {
            Some((intent, score)) if score >= FUZZY_THRESHOLD => {
                debug!(score, tag = intent.tag(), "fuzzy match accepted");
                let mut intent = intent.clone();
                // The vocabulary stores IoT intents without a value; pull
                // the numeric argument from the live utterance.
                if let Intent::IotAction { value, .. } = &mut intent {
                    *value = matcher::first_number(&text);
                }
                vec![StructuredCommand::bare(intent)]
            }
            Some((_, score)) => {
                debug!(score, "best fuzzy score below threshold");
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

/// Normalized Levenshtein similarity on the 0–100 scale.
///
/// Identical strings score 100; strings with nothing in common score 0.
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let longest = a_len.max(b_len);
    if longest == 0 {
        return 100;
    }
    let distance = levenshtein(a, b);
    let ratio = 100.0 * (1.0 - distance as f64 / longest as f64);
    ratio.round().clamp(0.0, 100.0) as u8
}

/// Character-level Levenshtein edit distance.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single-row formulation to keep memory linear in |b|.
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let next = (row[j] + 1).min(row[j + 1] + 1).min(prev_diag + cost);
            prev_diag = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::lexicon::{EntryKind, LexiconEntry};

    fn lexicon() -> Lexicon {
        Lexicon {
            entries: vec![LexiconEntry {
                id: "telegram".into(),
                display_name: "Телеграм".into(),
                kind: EntryKind::App,
                target: "/usr/bin/telegram-desktop".into(),
                voice_phrases: vec!["телеграм".into()],
            }],
            sequences: Vec::new(),
            iot_devices: Vec::new(),
        }
    }

    #[test]
    fn levenshtein_known_distances() {
        assert_eq!(levenshtein("кіт", "кіт"), 0);
        assert_eq!(levenshtein("кіт", "кит"), 1);
        assert_eq!(levenshtein("", "абв"), 3);
        assert_eq!(levenshtein("абв", ""), 3);
    }

    #[test]
    fn ratio_is_100_for_identical_and_0_for_disjoint() {
        assert_eq!(similarity_ratio("година", "година"), 100);
        assert_eq!(similarity_ratio("", ""), 100);
        assert_eq!(similarity_ratio("абаб", "вгвг"), 0);
    }

    #[test]
    fn near_miss_matches_above_threshold() {
        let matcher = FuzzyMatcher::from_lexicon(&lexicon());
        // One dropped letter from "котра година".
        let commands = matcher.interpret("котра годин");
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].intent, Intent::CurrentTime);
    }

    #[test]
    fn garbage_scores_below_threshold() {
        let matcher = FuzzyMatcher::from_lexicon(&lexicon());
        assert!(matcher.interpret("синхрофазотрон запускається").is_empty());
        assert!(matcher.interpret("").is_empty());
    }

    #[test]
    fn never_accepts_below_threshold() {
        let matcher = FuzzyMatcher::from_lexicon(&lexicon());
        for (phrase, _) in &matcher.vocabulary {
            // A string that shares no characters with any phrase.
            let score = similarity_ratio("zzzzzzzz", phrase);
            assert!(score < FUZZY_THRESHOLD, "unexpected score {score} for {phrase}");
        }
    }

    #[test]
    fn open_entry_phrase_is_recoverable() {
        let matcher = FuzzyMatcher::from_lexicon(&lexicon());
        // ASR mangled one letter of the verb.
        let commands = matcher.interpret("відкрий телеграми");
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].intent,
            Intent::OpenEntry {
                entry_id: "telegram".into()
            }
        );
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let matcher = FuzzyMatcher::from_lexicon(&lexicon());
        let first = matcher.interpret("котра годин");
        let second = matcher.interpret("котра годин");
        assert_eq!(first, second);
    }

    #[test]
    fn vocabulary_contains_builtins_and_lexicon() {
        let matcher = FuzzyMatcher::from_lexicon(&lexicon());
        // 4 time + 2 capability + 3 architecture + 3 power + 2 suspend
        // + 2 window + 3 notes + 1 memory + 2 open verbs × 1 phrase.
        assert_eq!(matcher.vocabulary_len(), 22);
    }
}
