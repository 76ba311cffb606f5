//! Capability traits: the seams between the engine and the outside world.
//!
//! Speech recognition, speech output, the completion endpoint, OS actions
//! and IoT transports are collaborators. The engine only ever talks to
//! these traits; concrete implementations live in [`crate::llm`],
//! [`crate::system`] and in the embedding application.

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Speech recognition source.
///
/// Implementations run their own capture loop (typically on a dedicated
/// thread), push recognized text into `text_tx` and optional 0–100 mic
/// levels into `level_tx`, and stop promptly when `cancel` fires.
pub trait SpeechToText: Send + Sync {
    fn start(
        &self,
        text_tx: mpsc::Sender<String>,
        level_tx: Option<mpsc::Sender<u8>>,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Speech output sink.
///
/// Calls are serialized by the pipeline's speech queue, so implementations
/// never observe overlapping playback.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Text-completion capability (NLU and free chat).
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one system+user exchange; `Ok(None)` means the backend answered
    /// but produced no usable content.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<Option<String>>;
}

/// OS-level actions behind the dispatcher.
pub trait SystemControl: Send + Sync {
    /// Launch an application by path or bare name.
    fn launch(&self, target: &str) -> Result<()>;
    /// Open a file or folder with the default handler.
    fn open_path(&self, path: &str) -> Result<()>;
    /// Open a URL in the default browser.
    fn open_url(&self, url: &str) -> Result<()>;
    /// Terminate a process by executable name.
    fn terminate(&self, process: &str) -> Result<()>;
    /// Minimize all windows / show the desktop.
    fn minimize_all(&self) -> Result<()>;
    /// Capture a screenshot, returning the saved path.
    fn screenshot(&self) -> Result<PathBuf>;
    /// Shut the machine down.
    fn power_off(&self) -> Result<()>;
    /// Suspend the machine.
    fn suspend(&self) -> Result<()>;
}

/// HTTP method for IoT dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Parse the method string stored in the lexicon; anything that is not
    /// `POST` dispatches as `GET`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("post") {
            Self::Post
        } else {
            Self::Get
        }
    }
}

/// One-shot IoT transports. Each call is a single send with a short
/// timeout; retries, if any, belong to the implementation.
#[async_trait]
pub trait IotTransport: Send + Sync {
    async fn http_send(&self, url: &str, method: HttpMethod, payload: &str) -> Result<()>;
    async fn mqtt_publish(&self, broker: &str, topic: &str, payload: &str) -> Result<()>;
    async fn serial_write(&self, port: &str, baud: u32, payload: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn http_method_parse_defaults_to_get() {
        assert_eq!(HttpMethod::parse("GET"), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("post"), HttpMethod::Post);
        assert_eq!(HttpMethod::parse("POST"), HttpMethod::Post);
        assert_eq!(HttpMethod::parse(""), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("PUT"), HttpMethod::Get);
    }
}
