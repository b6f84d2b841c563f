//! Chat-completion backends.
//!
//! [`ChatBackend`] is the seam between the translator and the network:
//! [`HttpBackend`] talks to an OpenAI-compatible endpoint, while
//! [`MockBackend`] replays scripted replies for tests and offline runs.

use crate::config::ProviderConfig;
use crate::error::TranslationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system" or "user".
    pub role: String,
    /// Content of the message.
    pub content: String,
}

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

/// Response from the chat completions API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

/// A single choice in the response.
#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

/// Message content in a response.
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// A service that completes a system + user conversation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one request to `provider` and returns the assistant's reply.
    async fn complete(
        &self,
        provider: &ProviderConfig,
        system_prompt: &str,
        content: &str,
    ) -> Result<String, TranslationError>;
}

/// Backend for OpenAI-compatible HTTP endpoints.
#[derive(Debug, Clone, Default)]
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn complete(
        &self,
        provider: &ProviderConfig,
        system_prompt: &str,
        content: &str,
    ) -> Result<String, TranslationError> {
        let key = provider.credential().ok_or_else(|| {
            TranslationError::InvalidConfig(format!("no API key for provider '{}'", provider.name))
        })?;

        let request = ChatRequest {
            model: &provider.model,
            messages: build_messages(system_prompt, content),
            temperature: provider.temperature,
            max_tokens: provider.max_tokens,
        };

        let response = self
            .client
            .post(provider.endpoint())
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_completion(&body)
    }
}

/// Builds the two-message conversation sent for every document.
pub fn build_messages(system_prompt: &str, content: &str) -> Vec<Message> {
    vec![
        Message {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        },
        Message {
            role: "user".to_string(),
            content: content.to_string(),
        },
    ]
}

/// Extracts the first choice's content from a success body.
fn parse_completion(body: &str) -> Result<String, TranslationError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| TranslationError::ParseError(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TranslationError::ParseError("No choices in API response".to_string()))?;

    match choice.message.and_then(|message| message.content) {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(TranslationError::EmptyResponse),
    }
}

/// Prefers the envelope's message, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Scripted reply for [`MockBackend`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with an HTTP 500 carrying this message.
    Fail(String),
}

/// Backend that replays queued replies per provider name.
///
/// A provider with an empty queue fails every call.
#[derive(Debug, Default)]
pub struct MockBackend {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the provider called `name`.
    pub fn push(&self, name: &str, reply: MockReply) -> &Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(name.to_string()).or_default().push_back(reply);
        }
        self
    }

    /// Provider names in the order they were called.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete(
        &self,
        provider: &ProviderConfig,
        _system_prompt: &str,
        _content: &str,
    ) -> Result<String, TranslationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(provider.name.clone());
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.get_mut(&provider.name)?.pop_front());

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(TranslationError::ApiError {
                status: 500,
                message,
            }),
            None => Err(TranslationError::ApiError {
                status: 503,
                message: format!("no scripted reply for '{}'", provider.name),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let provider = ProviderConfig::default();
        let request = ChatRequest {
            model: &provider.model,
            messages: build_messages("policy", "# Title"),
            temperature: provider.temperature,
            max_tokens: provider.max_tokens,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["max_tokens"], 8000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "policy");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "# Title");
        assert!(json["temperature"].is_number());
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"你好"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "你好");
    }

    #[test]
    fn test_parse_completion_keeps_content_verbatim() {
        let body = r#"{"choices":[{"message":{"content":"\n# 标题\n"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "\n# 标题\n");
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let result = parse_completion(r#"{"choices":[]}"#);
        assert!(matches!(result, Err(TranslationError::ParseError(_))));
    }

    #[test]
    fn test_parse_completion_empty_content() {
        let result = parse_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#);
        assert!(matches!(result, Err(TranslationError::EmptyResponse)));
    }

    #[test]
    fn test_parse_completion_null_or_missing_content() {
        for body in [
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"finish_reason":"length"}]}"#,
        ] {
            let result = parse_completion(body);
            assert!(
                matches!(result, Err(TranslationError::EmptyResponse)),
                "unexpected result for {body}: {result:?}"
            );
        }
    }

    #[test]
    fn test_parse_completion_malformed() {
        let result = parse_completion("<html>Bad Gateway</html>");
        assert!(matches!(result, Err(TranslationError::ParseError(_))));
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"message":"Insufficient Balance","type":"unknown_error"}}"#;
        assert_eq!(error_message(body), "Insufficient Balance");
        assert_eq!(error_message("upstream timeout"), "upstream timeout");
    }

    #[tokio::test]
    async fn test_http_backend_requires_credential() {
        let mut provider = ProviderConfig::default();
        provider.key = String::new();
        provider.key_env = None;

        let result = HttpBackend::new().complete(&provider, "policy", "text").await;
        assert!(matches!(result, Err(TranslationError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_mock_backend_replays_in_order() {
        let mock = MockBackend::new();
        mock.push("deepseek", MockReply::Fail("boom".to_string()))
            .push("deepseek", MockReply::Text("好".to_string()));
        let provider = ProviderConfig::default();

        assert!(mock.complete(&provider, "", "").await.is_err());
        assert_eq!(mock.complete(&provider, "", "").await.unwrap(), "好");
        assert!(mock.complete(&provider, "", "").await.is_err());
        assert_eq!(mock.calls(), vec!["deepseek"; 3]);
    }
}
