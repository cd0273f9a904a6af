//! Chat-completion call: send the assembled prompt, get the report text back.
//!
//! One request per submission, no retry, no streaming. The API key is a
//! parameter of every call rather than a field of the client, so one
//! process-wide client serves every user without ever holding a credential.
//!
//! ## Message Layout
//!
//! 1. **System message**: [`crate::prompts::SYSTEM_PROMPT`] (or the configured override)
//! 2. **User message**: the full comparison prompt

use crate::config::ServiceConfig;
use crate::error::{AppError, CompletionError};
use crate::prompts::{Prompt, SYSTEM_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A user-supplied API credential.
///
/// `Debug` and `Display` are redacted so the key cannot end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Something that can turn a prompt into a completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` and return the first choice's text.
    async fn complete(&self, api_key: &ApiKey, prompt: &Prompt) -> Result<String, CompletionError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    system_prompt: String,
}

impl OpenAiChatClient {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/chat/completions",
                config.api_base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| SYSTEM_PROMPT.to_string()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    async fn complete(&self, api_key: &ApiKey, prompt: &Prompt) -> Result<String, CompletionError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt.as_str(),
                },
            ],
        };

        info!(
            "Requesting completion: model={}, prompt={} chars",
            self.model,
            prompt.char_len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::InvalidResponse("no choices in response".into()))?;

        debug!(
            "Completion received: {} chars in {:?}",
            content.len(),
            start.elapsed()
        );
        Ok(content)
    }
}
