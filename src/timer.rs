//! Focus timer.
//!
//! One timer at a time: starting a new one replaces the old. On expiry the
//! timer announces itself through the shared speech queue, so the "time is
//! up" phrase is serialized with every other spoken reply.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Spoken when the timer fires.
const TIMER_DONE_PHRASE: &str = "Час вийшов!";

/// A single replaceable countdown timer.
#[derive(Debug, Default)]
pub struct FocusTimer {
    handle: Option<JoinHandle<()>>,
}

impl FocusTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a countdown is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start a countdown of `minutes`, replacing any running timer.
    pub fn start(&mut self, minutes: u64, speech_tx: mpsc::Sender<String>) {
        self.stop();
        debug!(minutes, "focus timer started");
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
            let _ = speech_tx.send(TIMER_DONE_PHRASE.to_owned()).await;
        }));
    }

    /// Stop the running countdown. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        if let Some(handle) = self.handle.take() {
            let was_running = !handle.is_finished();
            handle.abort();
            debug!("focus timer stopped");
            return was_running;
        }
        false
    }
}

impl Drop for FocusTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[tokio::test]
    async fn stop_without_start_reports_not_running() {
        let mut timer = FocusTimer::new();
        assert!(!timer.is_running());
        assert!(!timer.stop());
    }

    #[tokio::test]
    async fn start_then_stop() {
        let (tx, _rx) = mpsc::channel(4);
        let mut timer = FocusTimer::new();
        timer.start(60, tx);
        assert!(timer.is_running());
        assert!(timer.stop());
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_announces_through_speech_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = FocusTimer::new();
        timer.start(1, tx);

        // Advance virtual time past the one-minute countdown.
        tokio::time::advance(Duration::from_secs(61)).await;
        let spoken = rx.recv().await.unwrap();
        assert_eq!(spoken, TIMER_DONE_PHRASE);
    }

    #[tokio::test]
    async fn restart_replaces_previous_timer() {
        let (tx, _rx) = mpsc::channel(4);
        let mut timer = FocusTimer::new();
        timer.start(60, tx.clone());
        timer.start(30, tx);
        assert!(timer.is_running());
        timer.stop();
    }
}
