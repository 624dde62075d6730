//! Model client adapters.
//!
//! Every backend sits behind [`ModelClient::send`]: an ordered message list
//! plus sampling parameters in, response text out. The backend family is a
//! [`ClientType`] tag chosen in configuration:
//!
//! | ClientType   | Endpoint             | Uses                          |
//! |--------------|----------------------|-------------------------------|
//! | `chat`       | `/chat/completions`  | the full message list         |
//! | `completion` | `/completions`       | only the last message content |
//!
//! Adapters never retry. Transport, auth, and rate-limit failures surface as
//! [`ProviderError`] tagged with the backend name.

pub mod openai_compat;
pub mod registry;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use openai_compat::OpenAiCompatClient;
pub use registry::{ClientRegistry, Credentials, ResolvedModel};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Provider-side model id (e.g. `llama3-70b-8192`), not the CLI alias.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingParams {
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Backend API family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Multi-turn chat completions.
    #[default]
    Chat,
    /// Single prompt text completions.
    Completion,
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Completion => write!(f, "completion"),
        }
    }
}

/// Errors raised by a backend call. Never retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS, or timeout failure.
    #[error("[{backend}] request failed: {source}")]
    Transport {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    /// 401 / 403 from the backend.
    #[error("[{backend}] authentication rejected ({status}): {body}")]
    Unauthorized {
        backend: String,
        status: u16,
        body: String,
    },

    /// 429 from the backend.
    #[error("[{backend}] rate limited: {body}")]
    RateLimited { backend: String, body: String },

    /// Any other non-success status.
    #[error("[{backend}] API error ({status}): {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    /// Body was not the expected JSON shape or had no text.
    #[error("[{backend}] malformed response: {message}")]
    MalformedResponse { backend: String, message: String },

    /// Called with an empty message list.
    #[error("[{backend}] no messages to send")]
    EmptyPrompt { backend: String },
}

impl ProviderError {
    pub fn backend(&self) -> &str {
        match self {
            Self::Transport { backend, .. }
            | Self::Unauthorized { backend, .. }
            | Self::RateLimited { backend, .. }
            | Self::Status { backend, .. }
            | Self::MalformedResponse { backend, .. }
            | Self::EmptyPrompt { backend } => backend,
        }
    }
}

/// Uniform call signature over every provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn send(
        &self,
        messages: &[ChatMessage],
        params: &SamplingParams,
    ) -> Result<String, ProviderError>;
}
