//! Maps resolved commands to capability calls.
//!
//! Dispatch is an exhaustive `match` over [`Intent`]: each arm performs
//! exactly one capability call and produces a human-readable result string.
//! The dispatcher never retries and never lets a capability error escape —
//! every failure path becomes a spoken reply. Unknown or unhandled intents
//! return `handled = false` with a generic reply instead of an error.

use crate::capability::{CompletionBackend, HttpMethod, IotTransport, SystemControl};
use crate::command::{Intent, StructuredCommand, WindowAction};
use crate::lexicon::{Connection, EntryKind, Lexicon, Step};
use crate::memory::FactStore;
use crate::notes::NotesStore;
use crate::session::SessionState;
use crate::timer::FocusTimer;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Spoken description of what the assistant can do.
const CAPABILITIES_TEXT: &str = "Я інтелектуальний голосовий асистент. Я вмію запускати \
програми, відкривати файли і сайти, виконувати робочі режими, керувати IoT пристроями, \
вести нотатки та запам'ятовувати факти.";

/// Spoken description of how the assistant is built.
const ARCHITECTURE_TEXT: &str = "Моя архітектура складається з модулів розпізнавання мови, \
швидкого зіставлення команд, мовної моделі для складних запитів, шлюзу підтвердження \
небезпечних дій та виконавця команд.";

/// Generic reply for intents the dispatcher cannot handle.
const CANNOT_DO_TEXT: &str = "Поки що я такого не вмію.";

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Whether the command was handled (even if the capability failed —
    /// a failure report is still a handled turn).
    pub handled: bool,
    /// Reply spoken and displayed to the user.
    pub spoken_reply: String,
}

impl ExecutionOutcome {
    fn handled(reply: impl Into<String>) -> Self {
        Self {
            handled: true,
            spoken_reply: reply.into(),
        }
    }

    fn unhandled() -> Self {
        Self {
            handled: false,
            spoken_reply: CANNOT_DO_TEXT.to_owned(),
        }
    }
}

/// The action dispatcher.
pub struct Dispatcher {
    system: Arc<dyn SystemControl>,
    iot: Arc<dyn IotTransport>,
    facts: Arc<FactStore>,
    notes: NotesStore,
    timer: FocusTimer,
    speech_tx: mpsc::Sender<String>,
    completion: Option<Arc<dyn CompletionBackend>>,
    step_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        system: Arc<dyn SystemControl>,
        iot: Arc<dyn IotTransport>,
        facts: Arc<FactStore>,
        notes: NotesStore,
        speech_tx: mpsc::Sender<String>,
        step_delay: Duration,
    ) -> Self {
        Self {
            system,
            iot,
            facts,
            notes,
            timer: FocusTimer::new(),
            speech_tx,
            completion: None,
            step_delay,
        }
    }

    /// Attach a completion backend (used for note analysis).
    #[must_use]
    pub fn with_completion(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.completion = Some(backend);
        self
    }

    /// The notes store behind this dispatcher.
    #[must_use]
    pub fn notes(&self) -> &NotesStore {
        &self.notes
    }

    /// Execute one command. Side effects happen exactly once per call.
    pub async fn execute(
        &mut self,
        lexicon: &Lexicon,
        session: &mut SessionState,
        command: StructuredCommand,
    ) -> ExecutionOutcome {
        info!(tag = command.intent.tag(), "executing intent");

        match command.intent {
            Intent::Capabilities => ExecutionOutcome::handled(CAPABILITIES_TEXT),
            Intent::Architecture => ExecutionOutcome::handled(ARCHITECTURE_TEXT),
            Intent::CurrentTime => {
                let now = Local::now().format("%H:%M");
                ExecutionOutcome::handled(format!("Поточний час: {now}."))
            }
            Intent::OpenEntry { entry_id } => self.open_entry(lexicon, &entry_id),
            Intent::CloseApp { entry_id } => self.close_app(lexicon, &entry_id),
            Intent::RunSequence { sequence_id } => self.run_sequence(lexicon, &sequence_id).await,
            Intent::IotAction {
                device_id,
                action_name,
                value,
            } => self.run_iot_action(lexicon, &device_id, &action_name, value).await,
            Intent::StartTimer { minutes } => {
                self.timer.start(minutes, self.speech_tx.clone());
                ExecutionOutcome::handled(format!("Таймер на {minutes} хвилин запущено."))
            }
            Intent::StopTimer => {
                if self.timer.stop() {
                    ExecutionOutcome::handled("Таймер зупинено.")
                } else {
                    ExecutionOutcome::handled("Таймер не запущено.")
                }
            }
            Intent::Window { action } => match action {
                WindowAction::MinimizeAll => match self.system.minimize_all() {
                    Ok(()) => ExecutionOutcome::handled("Виконую."),
                    Err(e) => {
                        warn!(error = %e, "window action failed");
                        ExecutionOutcome::handled("Не вдалося згорнути вікна.")
                    }
                },
            },
            Intent::StartNotes => match self.notes.create() {
                Ok(path) => {
                    session.notes_session = Some(path);
                    ExecutionOutcome::handled("Починаю запис нотаток.")
                }
                Err(e) => {
                    warn!(error = %e, "cannot start notes session");
                    ExecutionOutcome::handled("Не вдалося створити файл нотаток.")
                }
            },
            Intent::StopNotes => {
                if session.notes_session.take().is_some() {
                    ExecutionOutcome::handled("Запис нотаток завершено.")
                } else {
                    ExecutionOutcome::handled("Запис нотаток не активний.")
                }
            }
            Intent::AnalyzeNotes => self.analyze_notes().await,
            Intent::RememberFact { text } => match self.facts.remember(&text) {
                Ok(_) => ExecutionOutcome::handled("Запам'ятав."),
                Err(e) => {
                    warn!(error = %e, "cannot store fact");
                    ExecutionOutcome::handled("Помилка запису в пам'ять.")
                }
            },
            Intent::ClearMemory => match self.facts.clear() {
                Ok(()) => ExecutionOutcome::handled("Пам'ять очищено."),
                Err(e) => {
                    warn!(error = %e, "cannot clear facts");
                    ExecutionOutcome::handled("Не вдалося очистити пам'ять.")
                }
            },
            Intent::PowerOff => match self.system.power_off() {
                Ok(()) => ExecutionOutcome::handled("Вимикаю комп'ютер."),
                Err(e) => {
                    warn!(error = %e, "power off failed");
                    ExecutionOutcome::handled("Не вдалося вимкнути комп'ютер.")
                }
            },
            Intent::Suspend => match self.system.suspend() {
                Ok(()) => ExecutionOutcome::handled("Вводжу комп'ютер у сон."),
                Err(e) => {
                    warn!(error = %e, "suspend failed");
                    ExecutionOutcome::handled("Не вдалося ввести комп'ютер у сон.")
                }
            },
            Intent::Acknowledge { tag } => match command.spoken_reply {
                Some(reply) => {
                    info!(tag, "intent acknowledged with spoken reply");
                    ExecutionOutcome::handled(reply)
                }
                None => {
                    warn!(tag, "unhandled intent without spoken reply");
                    ExecutionOutcome::unhandled()
                }
            },
        }
    }

    fn open_entry(&self, lexicon: &Lexicon, entry_id: &str) -> ExecutionOutcome {
        let Some(entry) = lexicon.entry(entry_id) else {
            return ExecutionOutcome::handled(format!(
                "Запис '{entry_id}' не знайдено в налаштуваннях."
            ));
        };

        let name = &entry.display_name;
        let result = match entry.kind {
            EntryKind::Website => self
                .system
                .open_url(&entry.target)
                .map(|()| format!("Відкриваю сайт: {name}")),
            EntryKind::Folder => self
                .system
                .open_path(&entry.target)
                .map(|()| format!("Відкриваю папку: {name}")),
            EntryKind::File => self
                .system
                .open_path(&entry.target)
                .map(|()| format!("Відкриваю файл: {name}")),
            EntryKind::App => self
                .system
                .launch(&entry.target)
                .map(|()| format!("Запускаю: {name}")),
        };

        match result {
            Ok(reply) => ExecutionOutcome::handled(reply),
            Err(e) => {
                warn!(entry_id, error = %e, "cannot open entry");
                ExecutionOutcome::handled(format!("Не можу відкрити: {name}."))
            }
        }
    }

    fn close_app(&self, lexicon: &Lexicon, entry_id: &str) -> ExecutionOutcome {
        let entry = lexicon.entry(entry_id);
        let name = entry.map_or(entry_id, |e| e.display_name.as_str()).to_owned();

        // Prefer the executable name from the configured target.
        let process = entry
            .filter(|e| e.kind == EntryKind::App)
            .and_then(|e| {
                std::path::Path::new(&e.target)
                    .file_name()
                    .and_then(|f| f.to_str())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| entry_id.to_owned());

        match self.system.terminate(&process) {
            Ok(()) => ExecutionOutcome::handled(format!("Закриваю {name}.")),
            Err(e) => {
                warn!(entry_id, error = %e, "cannot close app");
                ExecutionOutcome::handled(format!("Не знайшов запущений {name}."))
            }
        }
    }

    /// Run an automation sequence. Steps execute in declared order; a step
    /// failure is logged and does not stop the sequence. A fixed delay
    /// between steps lets side effects settle before the next one runs.
    async fn run_sequence(&self, lexicon: &Lexicon, sequence_id: &str) -> ExecutionOutcome {
        let Some(sequence) = lexicon.sequence(sequence_id) else {
            return ExecutionOutcome::handled("Режим не знайдено.".to_owned());
        };
        info!(sequence_id, steps = sequence.steps.len(), "running sequence");

        for step in &sequence.steps {
            match step {
                Step::OpenEntry { entry_id } => {
                    let outcome = self.open_entry(lexicon, entry_id);
                    info!(step = "OPEN_ENTRY", reply = outcome.spoken_reply.as_str(), "step done");
                }
                Step::CloseApp { entry_id } => {
                    let outcome = self.close_app(lexicon, entry_id);
                    info!(step = "CLOSE_APP", reply = outcome.spoken_reply.as_str(), "step done");
                }
                Step::OpenWebsite { url } => {
                    if let Err(e) = self.system.open_url(url) {
                        warn!(url, error = %e, "sequence step failed");
                    }
                }
                Step::Window { action } => match action {
                    WindowAction::MinimizeAll => {
                        if let Err(e) = self.system.minimize_all() {
                            warn!(error = %e, "sequence step failed");
                        }
                    }
                },
                Step::Wait { seconds } => {
                    tokio::time::sleep(Duration::from_secs(*seconds)).await;
                }
                Step::Iot {
                    device_id,
                    action_name,
                    value,
                } => {
                    let outcome = self
                        .run_iot_action(lexicon, device_id, action_name, *value)
                        .await;
                    info!(step = "IOT", reply = outcome.spoken_reply.as_str(), "step done");
                }
            }
            tokio::time::sleep(self.step_delay).await;
        }

        ExecutionOutcome::handled(format!("Режим '{}' виконано.", sequence.display_name))
    }

    async fn run_iot_action(
        &self,
        lexicon: &Lexicon,
        device_id: &str,
        action_name: &str,
        value: Option<i64>,
    ) -> ExecutionOutcome {
        let Some(device) = lexicon.device(device_id) else {
            return ExecutionOutcome::handled(format!("Пристрій '{device_id}' не знайдено."));
        };
        let Some(action) = device.actions.iter().find(|a| a.name == action_name) else {
            return ExecutionOutcome::handled(format!(
                "Дія '{action_name}' не знайдена для {}.",
                device.display_name
            ));
        };

        let payload = match value {
            Some(v) if action.payload_template.contains("{value}") => {
                action.payload_template.replace("{value}", &v.to_string())
            }
            _ => action.payload_template.clone(),
        };

        let result = match &device.connection {
            Connection::Http { url, method } => {
                self.iot
                    .http_send(url, HttpMethod::parse(method), &payload)
                    .await
            }
            Connection::Mqtt { broker, topic } => self.iot.mqtt_publish(broker, topic, &payload).await,
            Connection::Serial { port, baud } => self.iot.serial_write(port, *baud, &payload).await,
        };

        match result {
            Ok(()) => ExecutionOutcome::handled(format!(
                "Виконано: {} - {}.",
                device.display_name, action.name
            )),
            Err(e) => {
                warn!(device_id, action_name, error = %e, "IoT action failed");
                ExecutionOutcome::handled(format!("Помилка IoT: {}.", device.display_name))
            }
        }
    }

    async fn analyze_notes(&self) -> ExecutionOutcome {
        let Some(backend) = &self.completion else {
            return ExecutionOutcome::handled("Для аналізу нотаток потрібна мовна модель.");
        };
        let latest = match self.notes.latest() {
            Ok(Some(path)) => path,
            Ok(None) => return ExecutionOutcome::handled("Не знайшов файлів нотаток."),
            Err(e) => {
                warn!(error = %e, "cannot list notes");
                return ExecutionOutcome::handled("Не вдалося прочитати нотатки.");
            }
        };
        let content = match self.notes.read(&latest) {
            Ok(c) if !c.trim().is_empty() => c,
            Ok(_) => return ExecutionOutcome::handled("Файл нотаток порожній."),
            Err(e) => {
                warn!(error = %e, "cannot read note");
                return ExecutionOutcome::handled("Не вдалося прочитати нотатки.");
            }
        };

        let prompt = format!(
            "Проаналізуй ці нотатки. Виділи головні думки, структуруй їх у список. \
             Виправ помилки, якщо є.\n\nТекст нотаток:\n{content}"
        );
        match backend
            .complete("Ти аналітик тексту. Структуруй нотатки українською.", &prompt)
            .await
        {
            Ok(Some(analysis)) => {
                if let Err(e) = self
                    .notes
                    .append(&latest, &format!("\n--- Аналіз ---\n{analysis}"))
                {
                    warn!(error = %e, "cannot append analysis to note");
                }
                ExecutionOutcome::handled(format!("Ось результат аналізу: {analysis}"))
            }
            Ok(None) => ExecutionOutcome::handled("Мовна модель не дала відповіді."),
            Err(e) => {
                warn!(error = %e, "note analysis failed");
                ExecutionOutcome::handled("Не вдалося проаналізувати нотатки.")
            }
        }
    }
}
