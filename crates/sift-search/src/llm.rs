use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sift_core::{BackendError, LlmConfig};
use tracing::debug;

/// One backend invocation: system instructions plus the user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Instructions describing the task and the reply schema.
    pub system: String,
    /// The query and body to search.
    pub prompt: String,
}

/// A text-completion service that performs the relevance judgment.
///
/// Implementations own their transport, authentication, and timeout policy.
/// Each call completes exactly once with either the raw reply text or an
/// error; the orchestrator never retries.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send `request` and return the model's raw textual reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;

    /// Model identifier, for diagnostics.
    fn model(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        (**self).complete(request).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use sift_search::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::User,
///     content: "Find mentions of refunds".into(),
/// };
/// assert!(matches!(msg.role, Role::User));
/// ```
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
/// use sift_search::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint:
/// OpenAI, Ollama, vLLM, LiteLLM, etc.
///
/// # Examples
///
/// ```
/// use sift_core::LlmConfig;
/// use sift_search::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.model_name(), "gpt-4o-mini");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// The API key comes from the config or the provider's environment
    /// variable; local providers such as `ollama` may omit it.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::MissingApiKey`] if a key is required but not
    /// found, or [`BackendError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, BackendError> {
        let api_key = config.resolve_api_key();
        if api_key.is_none() && config.requires_api_key() {
            return Err(BackendError::MissingApiKey {
                provider: config.provider.clone(),
                env_var: config.api_key_env_var().to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    /// Return the model name from the configuration.
    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/');
        format!("{base_url}/v1/chat/completions")
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
        });
        if self.config.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }

    /// Send a chat completion request and return the text response.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the request cannot be sent,
    /// [`BackendError::Api`] on a non-success status, or
    /// [`BackendError::UnexpectedResponse`] if no message content is present.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, BackendError> {
        let url = self.endpoint();
        let body = self.request_body(&messages);

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        request = request.header("Content-Type", "application/json");

        debug!(url = %url, model = %self.config.model, "sending chat completion");
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::UnexpectedResponse(format!("response is not JSON: {e}")))?;

        message_content(&response_body).map(str::to_string)
    }
}

#[async_trait]
impl Backend for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        self.chat(chat_messages(request)).await
    }

    fn model(&self) -> &str {
        self.model_name()
    }
}

fn chat_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::System,
            content: request.system.clone(),
        },
        ChatMessage {
            role: Role::User,
            content: request.prompt.clone(),
        },
    ]
}

fn message_content(response_body: &serde_json::Value) -> Result<&str, BackendError> {
    response_body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| BackendError::UnexpectedResponse(response_body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_config() -> LlmConfig {
        LlmConfig {
            api_key: Some("test-key".into()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn client_construction_succeeds() {
        assert!(LlmClient::new(&keyed_config()).is_ok());
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = LlmConfig {
            provider: "ollama".into(),
            base_url: Some("http://localhost:11434".into()),
            ..LlmConfig::default()
        };
        assert!(LlmClient::new(&config).is_ok());
    }

    #[test]
    fn model_returns_config_model() {
        let config = LlmConfig {
            model: "gpt-4o".into(),
            ..keyed_config()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.model_name(), "gpt-4o");
        assert_eq!(Backend::model(&client), "gpt-4o");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let config = LlmConfig {
            base_url: Some("http://localhost:8000/".into()),
            ..keyed_config()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn request_body_respects_json_mode() {
        let client = LlmClient::new(&keyed_config()).unwrap();
        let body = client.request_body(&[]);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["model"], "gpt-4o-mini");

        let config = LlmConfig {
            json_mode: false,
            ..keyed_config()
        };
        let client = LlmClient::new(&config).unwrap();
        assert!(client.request_body(&[]).get("response_format").is_none());
    }

    #[test]
    fn chat_message_serializes() {
        let msg = ChatMessage {
            role: Role::System,
            content: "hello".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn request_sends_system_then_user() {
        let request = CompletionRequest {
            system: "schema".into(),
            prompt: "Query: \"q\"".into(),
        };
        let client = LlmClient::new(&keyed_config()).unwrap();
        let body = client.request_body(&chat_messages(&request));
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "schema");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "Query: \"q\"");
    }

    #[test]
    fn message_content_extracts_first_choice() {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"matches\": []}" } }]
        });
        assert_eq!(message_content(&body).unwrap(), "{\"matches\": []}");
    }

    #[test]
    fn message_content_rejects_other_shapes() {
        let body = serde_json::json!({ "error": "nope" });
        assert!(matches!(
            message_content(&body),
            Err(BackendError::UnexpectedResponse(_))
        ));
    }
}
