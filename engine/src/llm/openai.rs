//! OpenAI chat-completions provider

use super::{LLMError, LLMProvider, Message};
use crate::config::OpenAIConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub struct OpenAIProvider {
    config: OpenAIConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, api_key: String, timeout: Duration) -> Self {
        Self {
            config,
            api_key,
            client: super::http_client(timeout),
        }
    }
}

/// Build the chat-completions payload shared by OpenAI-compatible endpoints.
pub(crate) fn chat_payload(model: Option<&str>, messages: &[Message]) -> serde_json::Value {
    let api_messages: Vec<serde_json::Value> = messages
        .iter()
        .map(|msg| {
            json!({
                "role": msg.role.to_string(),
                "content": msg.content
            })
        })
        .collect();

    let mut payload = json!({
        "messages": api_messages,
        "temperature": 0,
    });
    if let Some(model) = model {
        payload["model"] = json!(model);
    }
    payload
}

/// Pull `choices[0].message.content` out of a chat-completions response.
pub(crate) async fn read_completion(response: reqwest::Response) -> super::Result<String> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(LLMError::from_status(status, text));
    }

    let data: serde_json::Value = response
        .json()
        .await
        .map_err(|e| LLMError::ParseError(e.to_string()))?;

    let choice = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| LLMError::ParseError("No message in choice".to_string()))?;

    message
        .get("content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<String> {
        let base_url = self.config.base_url.trim_end_matches('/');
        let url = format!("{}/chat/completions", base_url);
        let payload = chat_payload(Some(&self.config.model), messages);

        tracing::debug!("OpenAI request: model={}, url={}", self.config.model, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_transport("OpenAI", base_url, e))?;

        read_completion(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_payload_is_deterministic() {
        let payload = chat_payload(
            Some("gpt-4o-mini"),
            &[Message::system("plan"), Message::user("objective")],
        );
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["temperature"], 0);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "objective");
    }

    #[test]
    fn test_chat_payload_without_model() {
        let payload = chat_payload(None, &[Message::system("x")]);
        assert!(payload.get("model").is_none());
    }

    #[test]
    fn test_provider_properties() {
        let provider = OpenAIProvider::new(
            OpenAIConfig::default(),
            "sk-test".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(provider.name(), "openai");
        assert!(!provider.is_local());
    }
}
