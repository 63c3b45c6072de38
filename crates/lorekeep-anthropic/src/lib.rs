// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider adapter for Lorekeep.
//!
//! Implements [`ProviderAdapter`] over the Anthropic Messages API. The
//! reasoning extraction strategy is its only caller.

pub mod client;
pub mod types;

use async_trait::async_trait;
use lorekeep_config::model::AnthropicConfig;
use lorekeep_core::error::LorekeepError;
use lorekeep_core::traits::{PluginAdapter, ProviderAdapter};
use lorekeep_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};
use tracing::debug;

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Anthropic Claude provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config, then `ANTHROPIC_API_KEY`, then error.
pub struct AnthropicProvider {
    client: AnthropicClient,
}

impl AnthropicProvider {
    /// Creates a provider from the `[anthropic]` configuration section.
    pub fn new(config: &AnthropicConfig) -> Result<Self, LorekeepError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = AnthropicClient::new(&api_key, &config.api_version, &config.base_url)?;
        debug!(base_url = %config.base_url, "Anthropic provider initialized");
        Ok(Self { client })
    }

    /// Creates a provider with an existing client.
    pub fn with_client(client: AnthropicClient) -> Self {
        Self { client }
    }
}

fn to_message_request(request: ProviderRequest) -> MessageRequest {
    MessageRequest {
        model: request.model,
        messages: request
            .messages
            .into_iter()
            .map(|m| ApiMessage {
                role: m.role,
                content: m.content,
            })
            .collect(),
        system: request.system_prompt,
        max_tokens: request.max_tokens,
    }
}

/// The API key from config, or from `ANTHROPIC_API_KEY` when the config has none.
pub fn resolve_api_key(config_key: &Option<String>) -> Result<String, LorekeepError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            LorekeepError::Config(
                "Anthropic API key not found. Set anthropic.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
            )
        })
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, LorekeepError> {
        // No API call: a health probe would spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LorekeepError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, LorekeepError> {
        let api_request = to_message_request(request);
        let response = self.client.complete_message(&api_request).await?;

        Ok(ProviderResponse {
            content: response.text(),
            model: response.model,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorekeep_core::types::ProviderMessage;
    use serial_test::serial;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> AnthropicConfig {
        AnthropicConfig {
            api_key: Some("sk-test-123".into()),
            base_url: base_url.to_string(),
            ..AnthropicConfig::default()
        }
    }

    #[test]
    fn resolve_api_key_from_config() {
        assert_eq!(resolve_api_key(&Some("sk-test-123".into())).unwrap(), "sk-test-123");
    }

    #[test]
    #[serial]
    fn resolve_api_key_falls_back_to_env() {
        unsafe { std::env::set_var("ANTHROPIC_API_KEY", "sk-from-env") };
        assert_eq!(resolve_api_key(&Some(String::new())).unwrap(), "sk-from-env");
        assert_eq!(resolve_api_key(&None).unwrap(), "sk-from-env");
        unsafe { std::env::remove_var("ANTHROPIC_API_KEY") };
    }

    #[test]
    #[serial]
    fn resolve_api_key_missing_everywhere() {
        unsafe { std::env::remove_var("ANTHROPIC_API_KEY") };
        let err = resolve_api_key(&None).unwrap_err().to_string();
        assert!(err.contains("API key not found"), "got: {err}");
    }

    #[test]
    fn request_conversion_keeps_roles_and_system() {
        let request = ProviderRequest {
            model: "claude-haiku-4-5-20250901".into(),
            system_prompt: Some("Extract one learning.".into()),
            messages: vec![ProviderMessage {
                role: "user".into(),
                content: "transcript".into(),
            }],
            max_tokens: 512,
        };
        let converted = to_message_request(request);
        assert_eq!(converted.system.as_deref(), Some("Extract one learning."));
        assert_eq!(converted.messages[0].role, "user");
        assert_eq!(converted.max_tokens, 512);
    }

    #[tokio::test]
    async fn provider_metadata() {
        let provider = AnthropicProvider::new(&config("http://localhost:1")).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.adapter_type(), AdapterType::Provider);
        assert_eq!(provider.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn complete_round_trips_through_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-haiku-4-5-20250901",
                "system": "Extract one learning."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": "null"}],
                "model": "claude-haiku-4-5-20250901",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 1}
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(&config(&server.uri())).unwrap();
        let response = provider
            .complete(ProviderRequest {
                model: "claude-haiku-4-5-20250901".into(),
                system_prompt: Some("Extract one learning.".into()),
                messages: vec![ProviderMessage {
                    role: "user".into(),
                    content: "transcript".into(),
                }],
                max_tokens: 256,
            })
            .await
            .unwrap();

        assert_eq!(response.content, "null");
        assert_eq!(response.usage.input_tokens, 12);
    }
}
