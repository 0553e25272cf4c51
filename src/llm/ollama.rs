use super::{http_client, non_empty, send_json, LlmBackend, LlmError};
use crate::models::{OllamaRequest, OllamaResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Local model server speaking the Ollama `/api/generate` protocol.
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            system: system_prompt,
        };

        let body: OllamaResponse = send_json(
            self.client
                .post(format!("{}/api/generate", self.endpoint))
                .json(&request),
        )
        .await?;

        non_empty(body.response)
    }
}
