//! Text generation backends.
//!
//! Every backend does exactly one POST per `generate` call: no retries, no
//! streaming. Failures are classified into [`LlmError`] so the command layer
//! can answer in kind.

mod gemini;
mod ollama;
mod openrouter;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;
pub use openrouter::OpenRouterBackend;

use crate::config::{LlmBackendConfig, LlmConfig};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Longest backend error body we echo back.
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("backend unreachable")]
    Unreachable,
    #[error("backend timed out")]
    TimedOut,
    #[error("backend error: {0}")]
    BackendError(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Request URLs can carry credentials, so error details never include them.
impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            LlmError::TimedOut
        } else if err.is_connect() {
            LlmError::Unreachable
        } else if err.is_decode() {
            LlmError::BackendError(format!("malformed response: {err}"))
        } else if err.is_status() {
            LlmError::BackendError(err.to_string())
        } else {
            LlmError::Unexpected(err.to_string())
        }
    }
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Backends without a native system prompt fold it into the request the
    /// way their API expects.
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>)
        -> Result<String, LlmError>;
}

pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let backend: Arc<dyn LlmBackend> = match &config.backend {
        LlmBackendConfig::Ollama { endpoint, model } => {
            Arc::new(OllamaBackend::new(endpoint, model, config.timeout)?)
        }
        LlmBackendConfig::Gemini {
            endpoint,
            api_key,
            model,
        } => Arc::new(GeminiBackend::new(endpoint, api_key, model, config.timeout)?),
        LlmBackendConfig::OpenRouter {
            endpoint,
            api_key,
            model,
        } => Arc::new(OpenRouterBackend::new(
            endpoint,
            api_key,
            model,
            config.timeout,
        )?),
    };
    Ok(backend)
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            LlmError::Unexpected(format!("cannot build HTTP client: {}", e.without_url()))
        })
}

/// Sends `request` and decodes a successful JSON body into `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, LlmError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::BackendError(format!(
            "{status}: {}",
            summarize_error_body(&body)
        )));
    }

    Ok(response.json().await?)
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim_start();
    if trimmed.starts_with("<!DOCTYPE") || trimmed.to_lowercase().starts_with("<html") {
        return "server returned an HTML error page".to_string();
    }

    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{head}... (truncated)")
    } else {
        trimmed.to_string()
    }
}

pub(crate) fn non_empty(text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        Err(LlmError::BackendError("empty response".to_string()))
    } else {
        Ok(text)
    }
}
