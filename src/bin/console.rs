//! Text console frontend for the petra engine.
//!
//! Reads utterances line-by-line from stdin and prints the assistant's
//! replies — the same serialized worker path a speech frontend uses, with
//! a print-to-stdout "voice". Useful for exercising the full command
//! pipeline without any audio stack.

use async_trait::async_trait;
use petra::capability::TextToSpeech;
use petra::config::{
    self, AssistantConfig, FallbackMode, default_config_path, default_lexicon_path,
    default_memory_path, default_notes_dir,
};
use petra::dispatcher::Dispatcher;
use petra::engine::Engine;
use petra::error::Result;
use petra::fallback::{Fallback, fuzzy::FuzzyMatcher, nlu::NluInterpreter};
use petra::lexicon::Lexicon;
use petra::llm::HttpCompletion;
use petra::memory::FactStore;
use petra::notes::NotesStore;
use petra::pipeline::coordinator::PipelineCoordinator;
use petra::system::{DesktopControl, HttpIotTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Speech output that prints to stdout.
struct ConsoleVoice;

#[async_trait]
impl TextToSpeech for ConsoleVoice {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("petra: {text}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let root = config::default_root_dir();
    let config = AssistantConfig::load_or_default(&default_config_path(&root))?;
    let lexicon = Lexicon::load(&default_lexicon_path(&root))?;
    tracing::info!(
        entries = lexicon.entries.len(),
        sequences = lexicon.sequences.len(),
        devices = lexicon.iot_devices.len(),
        "lexicon loaded"
    );

    let facts = Arc::new(FactStore::open(&default_memory_path(&root))?);
    let notes = NotesStore::new(default_notes_dir(&root));
    let (speech_tx, speech_rx) = mpsc::channel::<String>(32);

    let mut dispatcher = Dispatcher::new(
        Arc::new(DesktopControl),
        Arc::new(HttpIotTransport::new()?),
        Arc::clone(&facts),
        notes,
        speech_tx.clone(),
        Duration::from_millis(config.engine.step_delay_ms),
    );

    let completion: Option<Arc<HttpCompletion>> = match config.fallback.mode {
        FallbackMode::Nlu => Some(Arc::new(HttpCompletion::new(&config.llm)?)),
        FallbackMode::Fuzzy => None,
    };

    let fallback = match &completion {
        Some(backend) => {
            dispatcher = dispatcher.with_completion(backend.clone());
            Fallback::Nlu(NluInterpreter::new(backend.clone()))
        }
        None => Fallback::Fuzzy(FuzzyMatcher::from_lexicon(&lexicon)),
    };

    let mut engine = Engine::new(&config, lexicon, fallback, dispatcher, facts);
    if let Some(backend) = completion {
        engine = engine.with_chat_backend(backend);
    }

    // Manual input bypasses the wake gate, so speech capture stays off.
    let coordinator = PipelineCoordinator::start(
        engine,
        &config.wake,
        None,
        Arc::new(ConsoleVoice),
        speech_rx,
        speech_tx,
    )?;

    println!("petra console — введіть команду (порожній рядок або Ctrl-D для виходу)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_owned();
        if line.is_empty() || line == "вихід" || line == "exit" {
            break;
        }
        coordinator.inject_text(line).await?;
        // Let the turn finish before prompting again; replies print from
        // the speech queue.
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    coordinator.shutdown().await;
    Ok(())
}
