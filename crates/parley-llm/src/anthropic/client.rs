// Anthropic Messages API client implementation

use crate::anthropic::types::MessagesResponse;
use crate::buffer_utils::parse_sse_stream;
use crate::streaming::MessagesSseParser;
use crate::traits::{ChatClient, ChatRequest, ChatResponse, EventStream, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Required by the API; used when the request does not set one
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic client (HTTP direct, no SDK)
///
/// - URL: {base_url}/messages
/// - Auth header: x-api-key, plus the anthropic-version header
#[derive(Debug)]
pub struct AnthropicClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AnthropicClient {
    /// Create new client with API key against the public endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> AnthropicClientBuilder {
        AnthropicClientBuilder::default()
    }

    /// Build messages request payload
    fn build_request(&self, request: ChatRequest, stream: bool) -> Result<Value> {
        let mut payload = serde_json::json!({
            "model": request.model,
            "max_tokens": request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": serde_json::to_value(&request.messages)?,
            "stream": stream,
        });

        let obj = payload
            .as_object_mut()
            .context("Request payload is not an object")?;

        if let Some(system) = request.options.system {
            obj.insert("system".to_string(), serde_json::json!(system));
        }
        if let Some(temp) = request.options.temperature {
            obj.insert("temperature".to_string(), serde_json::json!(temp));
        }

        Ok(payload)
    }

    async fn send(&self, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error ({}): {}", status, error_text);
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_request(request, false)?;
        let response = self.send(&payload).await?;

        let raw: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        Ok(ChatResponse {
            content: raw.text(),
            usage: raw.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
            finish_reason: raw.stop_reason.clone(),
            raw: serde_json::to_value(&raw)?,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload = self.build_request(request, true)?;
        let response = self.send(&payload).await?;

        tracing::debug!("Messages stream opened");
        Ok(parse_sse_stream(response.bytes_stream(), MessagesSseParser::new()))
    }
}

/// Builder for AnthropicClient
#[derive(Default)]
pub struct AnthropicClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    api_version: Option<String>,
}

impl AnthropicClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL (proxies, tests)
    /// Example: "https://api.anthropic.com/v1"
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn build(self) -> Result<AnthropicClient> {
        let api_key = self.api_key.context("API key is required")?;
        let api_version = self
            .api_version
            .unwrap_or_else(|| ANTHROPIC_VERSION.to_string());
        let base_url = self
            .base_url
            .unwrap_or_else(|| ANTHROPIC_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key).context("Invalid API key format")?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&api_version).context("Invalid API version format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(AnthropicClient {
            http_client,
            base_url,
        })
    }
}
