//! OpenAI-compatible HTTP adapter (OpenAI, Groq, local vLLM / llama.cpp).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{ChatMessage, ClientType, ModelClient, ProviderError, SamplingParams};

/// Adapter for any backend that speaks the OpenAI REST dialect.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    backend: String,
    base_url: String,
    api_key: Option<String>,
    client_type: ClientType,
    http: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Build with a fresh HTTP client.
    pub fn new(
        backend: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        client_type: ClientType,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let backend = backend.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ProviderError::Transport {
                backend: backend.clone(),
                source,
            })?;
        Ok(Self::with_http(backend, base_url, api_key, client_type, http))
    }

    /// Build on top of a shared HTTP client (connection pool reuse).
    pub fn with_http(
        backend: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        client_type: ClientType,
        http: reqwest::Client,
    ) -> Self {
        Self {
            backend: backend.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client_type,
            http,
        }
    }

    fn endpoint(&self) -> String {
        match self.client_type {
            ClientType::Chat => format!("{}/chat/completions", self.base_url),
            ClientType::Completion => format!("{}/completions", self.base_url),
        }
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<serde_json::Value, ProviderError> {
        let last = messages.last().ok_or_else(|| ProviderError::EmptyPrompt {
            backend: self.backend.clone(),
        })?;
        Ok(match self.client_type {
            ClientType::Chat => serde_json::json!({
                "model": params.model,
                "messages": messages,
                "temperature": params.temperature,
                "max_tokens": params.max_tokens,
            }),
            ClientType::Completion => serde_json::json!({
                "model": params.model,
                "prompt": last.content,
                "temperature": params.temperature,
                "max_tokens": params.max_tokens,
            }),
        })
    }

    fn extract_text(&self, body: &serde_json::Value) -> Result<String, ProviderError> {
        let choice = &body["choices"][0];
        let text = match self.client_type {
            ClientType::Chat => choice["message"]["content"].as_str(),
            ClientType::Completion => choice["text"].as_str(),
        };
        text.map(str::to_string)
            .ok_or_else(|| ProviderError::MalformedResponse {
                backend: self.backend.clone(),
                message: format!("no {} text in choices[0]", self.client_type),
            })
    }

    fn status_error(&self, status: StatusCode, body: String) -> ProviderError {
        let backend = self.backend.clone();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized {
                backend,
                status: status.as_u16(),
                body,
            },
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { backend, body },
            _ => ProviderError::Status {
                backend,
                status: status.as_u16(),
                body,
            },
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    async fn send(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, ProviderError> {
        let body = self.request_body(messages, params)?;
        let start = std::time::Instant::now();

        let mut request = self.http.post(self.endpoint()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                backend: self.backend.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, body));
        }

        let resp_json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse {
                    backend: self.backend.clone(),
                    message: e.to_string(),
                })?;

        let text = self.extract_text(&resp_json)?;
        tracing::debug!(
            backend = %self.backend,
            model = %params.model,
            client_type = %self.client_type,
            turns = messages.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "provider call completed"
        );
        Ok(text)
    }
}
