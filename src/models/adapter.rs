//! Provider adapters
//!
//! Translates the generic completion request into each provider's native
//! API and returns the raw status and body untouched.

use crate::config::ProviderConfig;
use crate::models::{ChatMessage, CompletionRequest};
use async_trait::async_trait;
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Wire format spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// `POST {base}/chat/completions` with bearer auth
    OpenAi,
    /// `POST {base}/messages` with `x-api-key`
    Anthropic,
}

impl AdapterKind {
    /// Resolve a configured provider type; `None` if unsupported
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "openai" | "openai-compatible" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }
}

/// Raw provider reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub status: u16,
    pub body: String,
}

impl ProviderReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Adapter failures that produced no provider reply
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("unsupported provider type '{kind}'")]
    UnsupportedType { kind: String },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Performs one call against a provider
///
/// Implementations must not retry; the router owns retry and escalation.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn call(
        &self,
        provider: &ProviderConfig,
        request: &CompletionRequest,
    ) -> Result<ProviderReply, AdapterError>;
}

/// HTTP adapter covering every supported provider type
#[derive(Debug, Clone, Default)]
pub struct HttpAdapter {
    client: reqwest::Client,
}

impl HttpAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ProviderReply, AdapterError> {
        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        Ok(ProviderReply { status, body })
    }

    async fn call_openai(
        &self,
        provider: &ProviderConfig,
        request: &CompletionRequest,
    ) -> Result<ProviderReply, AdapterError> {
        let url = format!("{}/chat/completions", provider.base_url().trim_end_matches('/'));
        let payload = json!({
            "model": provider.model(),
            "messages": request.messages(),
            "max_tokens": request.max_tokens(),
            "temperature": request.temperature(),
        });

        let mut builder = self.client.post(&url).json(&payload);
        if let Some(key) = provider.api_key() {
            builder = builder.bearer_auth(key);
        }
        self.send(builder).await
    }

    async fn call_anthropic(
        &self,
        provider: &ProviderConfig,
        request: &CompletionRequest,
    ) -> Result<ProviderReply, AdapterError> {
        let url = format!("{}/messages", provider.base_url().trim_end_matches('/'));
        let payload = json!({
            "model": provider.model(),
            "max_tokens": request.max_tokens(),
            "temperature": request.temperature(),
            "messages": anthropic_messages(request.messages()),
        });

        let builder = self
            .client
            .post(&url)
            .header("x-api-key", provider.api_key().unwrap_or_default())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload);
        self.send(builder).await
    }
}

#[async_trait]
impl ProviderAdapter for HttpAdapter {
    async fn call(
        &self,
        provider: &ProviderConfig,
        request: &CompletionRequest,
    ) -> Result<ProviderReply, AdapterError> {
        match AdapterKind::parse(provider.kind()) {
            Some(AdapterKind::OpenAi) => self.call_openai(provider, request).await,
            Some(AdapterKind::Anthropic) => self.call_anthropic(provider, request).await,
            None => Err(AdapterError::UnsupportedType {
                kind: provider.kind().to_string(),
            }),
        }
    }
}

/// Anthropic rejects `system` in the message list
fn anthropic_messages(messages: &[ChatMessage]) -> Vec<&ChatMessage> {
    messages.iter().filter(|m| m.role != "system").collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_kind_parse() {
        assert_eq!(AdapterKind::parse("openai"), Some(AdapterKind::OpenAi));
        assert_eq!(AdapterKind::parse("openai-compatible"), Some(AdapterKind::OpenAi));
        assert_eq!(AdapterKind::parse("anthropic"), Some(AdapterKind::Anthropic));
        assert_eq!(AdapterKind::parse("xai"), None);
    }

    #[test]
    fn test_reply_success_is_any_2xx() {
        assert!(ProviderReply::new(200, "").is_success());
        assert!(ProviderReply::new(201, "").is_success());
        assert!(!ProviderReply::new(429, "").is_success());
        assert!(!ProviderReply::new(500, "").is_success());
    }

    #[test]
    fn test_anthropic_messages_drop_system_role() {
        let messages = vec![
            ChatMessage::new("system", "be brief"),
            ChatMessage::new("user", "hi"),
            ChatMessage::new("assistant", "hello"),
        ];
        let kept = anthropic_messages(&messages);
        let roles: Vec<_> = kept.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant"]);
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_without_network() {
        let provider: ProviderConfig = serde_json::from_value(json!({
            "id": "grok",
            "type": "xai",
            "base_url": "http://127.0.0.1:1/v1",
            "model": "grok-2"
        }))
        .unwrap();
        let request = CompletionRequest::new(vec![ChatMessage::new("user", "hi")]);

        let err = HttpAdapter::default().call(&provider, &request).await.unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedType { ref kind } if kind == "xai"));
    }
}
