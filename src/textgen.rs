//! Text generation through an OpenAI-style "completions" endpoint.
//!
//! This is the legacy prompt-in, text-out API rather than the chat API:
//! instruct models are a better fit for one-off story writing, and the
//! request and response shapes are about as simple as they get.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Something that can complete a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`, producing at most about `max_tokens` tokens. The
    /// text of the first completion choice is returned unmodified.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// [`TextGenerator`] that talks HTTP to a completions endpoint.
pub struct CompletionsClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl CompletionsClient {
    pub fn new(settings: &Settings) -> Self {
        CompletionsClient {
            http: reqwest::Client::new(),
            url: settings.completions_url.clone(),
            model: settings.completions_model.clone(),
            api_key: settings.api_key.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for CompletionsClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens,
        };

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to send completion request to {}", self.url))?;

        let status = resp.status();

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();

            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&text) {
                bail!(
                    "completion request failed with status {} ({}): {}",
                    status,
                    err.error.kind.as_deref().unwrap_or("api_error"),
                    err.error.message
                );
            }

            bail!("completion request failed with status {}: {}", status, text);
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .context("failed to parse completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| anyhow!("completion response contained no choices"))
    }
}
