//! OpenAI-compatible completion client.
//!
//! Works against any server implementing the chat completions API
//! (LM Studio, Ollama, llama.cpp server, a cloud gateway). The engine only
//! sees the [`CompletionBackend`] trait; network and decoding failures stay
//! inside this module and surface as recoverable errors.

use crate::capability::CompletionBackend;
use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP-backed completion client.
pub struct HttpCompletion {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl HttpCompletion {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is empty or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(AssistantError::Config("llm.base_url is empty".to_owned()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletion {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<Option<String>> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message},
            ],
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "completion endpoint returned an error");
            return Err(AssistantError::Llm(format!(
                "completion endpoint returned {status}: {text}"
            )));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("invalid JSON in completion body: {e}")))?;

        let content = data["choices"][0]["message"]["content"].as_str();
        if content.is_none() {
            debug!("completion body had no choices[0].message.content");
        }
        Ok(content.map(str::to_owned))
    }
}
