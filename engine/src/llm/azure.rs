//! Azure OpenAI provider
//!
//! Azure hosts OpenAI models behind per-resource deployments. The model is
//! fixed by the deployment, so the request body carries no `model` field and
//! authentication uses the `api-key` header instead of a bearer token.

use super::openai::{chat_payload, read_completion};
use super::{LLMError, LLMProvider, Message};
use crate::config::AzureOpenAIConfig;
use async_trait::async_trait;
use std::time::Duration;

pub struct AzureOpenAIProvider {
    config: AzureOpenAIConfig,
    api_key: String,
    client: reqwest::Client,
}

impl AzureOpenAIProvider {
    pub fn new(config: AzureOpenAIConfig, api_key: String, timeout: Duration) -> Self {
        Self {
            config,
            api_key,
            client: super::http_client(timeout),
        }
    }

    /// Resource endpoint, honoring an explicit `base_url` override
    fn endpoint(&self) -> String {
        match &self.config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.openai.azure.com", self.config.instance_name),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint(),
            self.config.deployment_name,
            self.config.api_version
        )
    }
}

#[async_trait]
impl LLMProvider for AzureOpenAIProvider {
    fn name(&self) -> &str {
        "azure_openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<String> {
        let url = self.completions_url();
        let payload = chat_payload(None, messages);

        tracing::debug!(
            "Azure OpenAI request: deployment={}, url={}",
            self.config.deployment_name,
            url
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_transport("Azure OpenAI", &self.endpoint(), e))?;

        read_completion(response).await
    }
}
