use super::{http_client, non_empty, send_json, LlmBackend, LlmError};
use crate::models::{ChatMessage, ChatRequest, ChatResponse, ChatRole};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// OpenRouter, or any other OpenAI-compatible chat completions endpoint.
pub struct OpenRouterBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenRouterBackend {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmBackend for OpenRouterBackend {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: ChatRole::System,
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: ChatRole::User,
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let body: ChatResponse = send_json(
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request),
        )
        .await?;

        let answer = body
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .collect::<String>();

        non_empty(answer)
    }
}
