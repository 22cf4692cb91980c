//! OpenAI chat-completions client.

use super::{ChatCompletion, ChatRequest};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

/// Public OpenAI endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SERVICE: &str = "OpenAI";

/// Client for `POST /chat/completions`
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

impl CompletionResponse {
    fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
    }
}

impl OpenAiClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

fn upstream(message: impl Into<String>) -> Error {
    Error::Upstream {
        service: SERVICE,
        message: message.into(),
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("OpenAI responded {status}: {body}");
            return Err(upstream(format!("{status}: {body}")));
        }
        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| upstream(e.to_string()))?;
        debug!(choices = parsed.choices.len(), "OpenAI completion received");
        parsed
            .first_content()
            .ok_or_else(|| upstream("response contained no message"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::external::{ChatMessage, ChatRole};

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage::new(ChatRole::System, "hi")],
            max_tokens: 700,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["max_tokens"], 700);
    }

    #[test]
    fn test_first_content_is_trimmed() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "  Hola!\n"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.first_content().as_deref(), Some("Hola!"));

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(empty.first_content().is_none());
    }
}
