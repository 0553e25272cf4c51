use super::{http_client, non_empty, send_json, LlmBackend, LlmError};
use crate::models::{GeminiContent, GeminiPart, GeminiRequest, GeminiResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Google Generative Language API (`generateContent`).
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(endpoint: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: prompt }],
            }],
            system_instruction: system_prompt.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            }),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let body: GeminiResponse = send_json(
            self.client
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(&request),
        )
        .await?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .ok_or_else(|| LlmError::BackendError("no candidates in response".to_string()))?;

        non_empty(text)
    }
}
