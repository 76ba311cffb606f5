//! Pipeline orchestrator wiring the engine to its collaborators.
//!
//! One utterance channel is fed by the speech-to-text capability and by
//! manual text injection; a single worker drains it in arrival order and
//! runs each utterance through the engine. All spoken output — turn
//! replies and asynchronous announcements such as the focus timer — goes
//! through one single-consumer speech queue, so playback never overlaps.
//!
//! Stopping is cooperative: a [`CancellationToken`] observed by the
//! capture capability, the worker and the speech queue.

use crate::capability::{SpeechToText, TextToSpeech};
use crate::config::WakeConfig;
use crate::engine::Engine;
use crate::error::{AssistantError, Result};
use crate::pipeline::messages::{PipelineEvent, Utterance, UtteranceSource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Utterance channel depth; recognition is slow compared to processing,
/// so a short buffer is plenty.
const UTTERANCE_CHANNEL_SIZE: usize = 16;

/// Event fan-out buffer for frontends.
const EVENT_CHANNEL_SIZE: usize = 64;

/// Wake-word gating over recognized speech.
///
/// An utterance is admitted when it names the assistant (a leading alias
/// is stripped) or when the conversation is still hot — a previous
/// exchange happened within the active window. Ignored utterances never
/// reach the engine.
#[derive(Debug)]
pub struct WakeGate {
    enabled: bool,
    aliases: Vec<String>,
    active_window: Duration,
    last_interaction: Option<Instant>,
}

impl WakeGate {
    #[must_use]
    pub fn new(config: &WakeConfig) -> Self {
        Self {
            enabled: config.enabled,
            aliases: config.aliases.iter().map(|a| a.to_lowercase()).collect(),
            active_window: Duration::from_secs(config.active_window_secs),
            last_interaction: None,
        }
    }

    /// Admit or reject recognized speech. Returns the text to process,
    /// with a leading alias stripped.
    pub fn admit(&mut self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !self.enabled {
            self.last_interaction = Some(Instant::now());
            return Some(trimmed.to_owned());
        }

        let lowered = trimmed.to_lowercase();
        let has_alias = self.aliases.iter().any(|a| lowered.contains(a.as_str()));
        let conversation_active = self
            .last_interaction
            .is_some_and(|t| t.elapsed() < self.active_window);

        if !has_alias && !conversation_active {
            info!(text = trimmed, "ignored utterance without wake word");
            return None;
        }

        let mut result = trimmed.to_owned();
        if has_alias {
            for alias in &self.aliases {
                if lowered.starts_with(alias.as_str()) {
                    // Slice the lowered copy: the alias is a prefix of it
                    // by construction, so the boundary is always valid.
                    result = lowered[alias.len()..].trim().to_owned();
                    break;
                }
            }
        }
        if result.is_empty() {
            // A bare alias wakes the conversation but carries no command.
            self.last_interaction = Some(Instant::now());
            return None;
        }
        self.last_interaction = Some(Instant::now());
        Some(result)
    }
}

/// Handle to a running pipeline.
pub struct PipelineCoordinator {
    utterance_tx: mpsc::Sender<Utterance>,
    events: broadcast::Sender<PipelineEvent>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    speech_worker: JoinHandle<()>,
}

impl PipelineCoordinator {
    /// Start the pipeline.
    ///
    /// `speech_rx` is the consumer side of the speech queue whose sender
    /// was handed to the dispatcher; `stt` is optional — a text-only
    /// frontend runs on [`inject_text`](Self::inject_text) alone.
    pub fn start(
        mut engine: Engine,
        wake: &WakeConfig,
        stt: Option<Arc<dyn SpeechToText>>,
        tts: Arc<dyn TextToSpeech>,
        mut speech_rx: mpsc::Receiver<String>,
        speech_tx: mpsc::Sender<String>,
    ) -> Result<Self> {
        let cancel = CancellationToken::new();
        let (utterance_tx, mut utterance_rx) = mpsc::channel::<Utterance>(UTTERANCE_CHANNEL_SIZE);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        // Speech capture, if wired: recognized text flows into the same
        // utterance channel as manual input.
        if let Some(stt) = stt {
            let (text_tx, mut text_rx) = mpsc::channel::<String>(UTTERANCE_CHANNEL_SIZE);
            let (level_tx, mut level_rx) = mpsc::channel::<u8>(EVENT_CHANNEL_SIZE);
            stt.start(text_tx, Some(level_tx), cancel.child_token())?;

            let forward_tx = utterance_tx.clone();
            let forward_cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = forward_cancel.cancelled() => break,
                        maybe = text_rx.recv() => match maybe {
                            Some(text) => {
                                if forward_tx.send(Utterance::speech(text)).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        },
                    }
                }
            });

            let level_events = events.clone();
            let level_cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = level_cancel.cancelled() => break,
                        maybe = level_rx.recv() => match maybe {
                            Some(level) => {
                                let _ = level_events.send(PipelineEvent::MicLevel(level));
                            }
                            None => break,
                        },
                    }
                }
            });
        }

        // The worker: strictly one utterance at a time, in arrival order.
        let mut wake_gate = WakeGate::new(wake);
        let worker_events = events.clone();
        let worker_cancel = cancel.clone();
        let worker_speech_tx = speech_tx;
        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = worker_cancel.cancelled() => break,
                    maybe = utterance_rx.recv() => {
                        let Some(utterance) = maybe else { break };
                        let text = match utterance.source {
                            UtteranceSource::Speech => match wake_gate.admit(&utterance.text) {
                                Some(text) => text,
                                None => continue,
                            },
                            UtteranceSource::Manual => utterance.text.trim().to_owned(),
                        };
                        if text.is_empty() {
                            continue;
                        }

                        let _ = worker_events.send(PipelineEvent::UserText(text.clone()));
                        let replies = engine.process_utterance(&text).await;
                        for reply in replies {
                            let _ = worker_events.send(PipelineEvent::AssistantText(reply.clone()));
                            if worker_speech_tx.send(reply).await.is_err() {
                                warn!("speech queue closed");
                            }
                        }
                    }
                }
            }
            info!("pipeline worker stopped");
        });

        // The speech queue: one consumer, ordered playback.
        let speech_cancel = cancel.clone();
        let speech_worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = speech_cancel.cancelled() => break,
                    maybe = speech_rx.recv() => match maybe {
                        Some(text) => {
                            if let Err(e) = tts.speak(&text).await {
                                warn!(error = %e, "TTS failed");
                            }
                        }
                        None => break,
                    },
                }
            }
            info!("speech queue stopped");
        });

        Ok(Self {
            utterance_tx,
            events,
            cancel,
            worker,
            speech_worker,
        })
    }

    /// Queue typed input onto the same worker path as recognized speech.
    pub async fn inject_text(&self, text: impl Into<String>) -> Result<()> {
        self.utterance_tx
            .send(Utterance::manual(text.into()))
            .await
            .map_err(|_| AssistantError::Channel("pipeline worker is gone".to_owned()))
    }

    /// Subscribe to pipeline events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Stop the pipeline and wait for both workers to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.events.send(PipelineEvent::Stopped);
        let _ = self.worker.await;
        let _ = self.speech_worker.await;
    }
}
