// Configuration layer for provider client creation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::anthropic::AnthropicClient;
use crate::traits::ChatClient;

/// Type of LLM provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Anthropic,
}

/// Configuration for the Anthropic provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    /// Base URL (optional, defaults to https://api.anthropic.com/v1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            api_version: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Provider-specific configuration details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderDetails {
    Anthropic(AnthropicConfig),
}

/// Complete provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub details: ProviderDetails,
}

impl ProviderConfig {
    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self {
            details: ProviderDetails::Anthropic(AnthropicConfig::new(api_key)),
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        match self.details {
            ProviderDetails::Anthropic(_) => ProviderType::Anthropic,
        }
    }
}

impl From<AnthropicConfig> for ProviderConfig {
    fn from(config: AnthropicConfig) -> Self {
        Self {
            details: ProviderDetails::Anthropic(config),
        }
    }
}

/// Factory for creating chat clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_client(config: ProviderConfig) -> Result<Arc<dyn ChatClient>> {
        match config.details {
            ProviderDetails::Anthropic(anthropic) => {
                let mut builder = AnthropicClient::builder().api_key(anthropic.api_key);
                if let Some(base_url) = anthropic.base_url {
                    builder = builder.base_url(base_url);
                }
                if let Some(api_version) = anthropic.api_version {
                    builder = builder.api_version(api_version);
                }
                Ok(Arc::new(builder.build()?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_config() {
        let config = ProviderConfig::anthropic("test-key");
        assert_eq!(config.provider_type(), ProviderType::Anthropic);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ProviderConfig {
            details: ProviderDetails::Anthropic(
                AnthropicConfig::new("test-key").with_base_url("http://localhost:9000"),
            ),
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"type\":\"anthropic\""));
        let deserialized: ProviderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.provider_type(), deserialized.provider_type());
    }

    #[test]
    fn test_factory_builds_client() {
        assert!(ClientFactory::create_client(ProviderConfig::anthropic("k")).is_ok());
    }
}
