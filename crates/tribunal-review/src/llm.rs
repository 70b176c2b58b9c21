//! LLM capability boundary and the OpenAI-compatible client.
//!
//! [`Completion`] is the one-method contract the orchestrator depends
//! on: given a system and user prompt, return raw model text. The
//! production client speaks the `/v1/chat/completions` protocol, which
//! covers OpenAI, Ollama, vLLM, LiteLLM, and similar gateways.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tribunal_core::{LlmConfig, Result, TribunalError};

/// A message in a chat conversation with the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use tribunal_review::llm::Role;
///
/// assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Capability boundary: given prompts, return raw model text.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Run one completion with the given model.
    ///
    /// # Errors
    ///
    /// [`TribunalError::Config`] for missing or rejected credentials,
    /// [`TribunalError::Quota`] when the provider reports exhausted
    /// credits, [`TribunalError::Llm`] for other transport or protocol
    /// failures.
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions client.
///
/// # Examples
///
/// ```
/// use tribunal_core::LlmConfig;
/// use tribunal_review::llm::OpenAiClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = OpenAiClient::new(&config).unwrap();
/// ```
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TribunalError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| TribunalError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Default model from the configuration.
    pub fn default_model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Completion for OpenAiClient {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String> {
        // A custom base_url implies a local or proxied provider that may
        // not require a key; the hosted default does.
        if self.config.api_key.is_none() && self.config.base_url.is_none() {
            return Err(TribunalError::Config(
                "no LLM API key configured; set OPENAI_API_KEY or [llm] api_key".into(),
            ));
        }

        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com");
        let url = format!("{base_url}/v1/chat/completions");

        let messages = vec![
            ChatMessage {
                role: Role::System,
                content: system.to_string(),
            },
            ChatMessage {
                role: Role::User,
                content: user.to_string(),
            },
        ];
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": 0.1,
            "response_format": { "type": "json_object" },
        });

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| TribunalError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(completion_error(status, &body_text));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TribunalError::Llm(format!("failed to parse response: {e}")))?;

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                TribunalError::Llm(format!("unexpected response structure: {response_body}"))
            })?;

        Ok(content.to_string())
    }
}

fn completion_error(status: reqwest::StatusCode, body: &str) -> TribunalError {
    match status.as_u16() {
        401 | 403 => TribunalError::Config("LLM API key was rejected by the provider".into()),
        402 => TribunalError::Quota("provider reports payment required".into()),
        429 if body.contains("quota") || body.contains("credit") => {
            TribunalError::Quota("provider reports exhausted credits".into())
        }
        _ => TribunalError::Llm(format!("LLM API error {status}: {body}")),
    }
}
