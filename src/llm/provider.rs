//! Provider selection - builds the configured model client

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{LlmConfig, Provider};
use crate::llm::anthropic::{AnthropicClient, AnthropicConfig};
use crate::llm::client::{LlmError, ModelClient};
use crate::llm::gemini::{GeminiClient, GeminiConfig};

/// The model client chosen by `llm.provider`
#[derive(Debug)]
pub enum ProviderClient {
    Gemini(GeminiClient),
    Anthropic(AnthropicClient),
}

impl ProviderClient {
    /// Build a client from config and an already-resolved API key
    pub fn from_config(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let timeout = config.timeout_ms.map(Duration::from_millis);
        let client = match config.provider {
            Provider::Gemini => ProviderClient::Gemini(GeminiClient::new(
                api_key,
                GeminiConfig {
                    model: config.resolved_model(),
                    base_url: config.resolved_base_url(),
                    timeout,
                },
            )?),
            Provider::Anthropic => ProviderClient::Anthropic(AnthropicClient::new(
                api_key,
                AnthropicConfig {
                    model: config.resolved_model(),
                    base_url: config.resolved_base_url(),
                    max_tokens: config.max_tokens,
                    timeout,
                },
            )?),
        };
        log::info!("Using {} model {}", config.provider, client.model());
        Ok(client)
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    async fn query(&self, prompt: &str) -> Result<String, LlmError> {
        match self {
            ProviderClient::Gemini(client) => client.query(prompt).await,
            ProviderClient::Anthropic(client) => client.query(prompt).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ProviderClient::Gemini(client) => client.model(),
            ProviderClient::Anthropic(client) => client.model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider_is_gemini() {
        let client = ProviderClient::from_config(&LlmConfig::default(), "k".to_string()).unwrap();
        assert!(matches!(client, ProviderClient::Gemini(_)));
        assert_eq!(client.model(), crate::llm::gemini::DEFAULT_MODEL);
    }

    #[test]
    fn test_anthropic_with_model_override() {
        let config = LlmConfig {
            provider: Provider::Anthropic,
            model: Some("claude-3-5-haiku-latest".to_string()),
            ..Default::default()
        };
        let client = ProviderClient::from_config(&config, "k".to_string()).unwrap();
        assert!(matches!(client, ProviderClient::Anthropic(_)));
        assert_eq!(client.model(), "claude-3-5-haiku-latest");
    }
}
