//! Generic chat-completion request shared by every adapter
//!
//! Validation is enforced during deserialization - invalid instances cannot exist.

use serde::{Deserialize, Deserializer, Serialize};

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f64 = 0.7;

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Inbound chat-completion request
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
}

impl CompletionRequest {
    /// Build a request with default sampling parameters
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            task_id: None,
        }
    }

    /// Set the caller-supplied task identifier
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// Text used for classification and fingerprinting
    ///
    /// Contents of `user` and `system` messages joined by a single space.
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == "user" || m.role == "system")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<'de> Deserialize<'de> for CompletionRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawCompletionRequest {
            messages: Vec<ChatMessage>,
            #[serde(default)]
            max_tokens: Option<u32>,
            #[serde(default)]
            temperature: Option<f64>,
            #[serde(default)]
            task_id: Option<String>,
        }

        let raw = RawCompletionRequest::deserialize(deserializer)?;

        if raw.messages.is_empty() {
            return Err(serde::de::Error::custom("messages cannot be empty"));
        }

        let max_tokens = raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(serde::de::Error::custom("max_tokens must be greater than 0"));
        }

        let temperature = raw.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(serde::de::Error::custom(format!(
                "temperature must be a finite number between 0.0 and 2.0 (got {})",
                temperature
            )));
        }

        Ok(CompletionRequest {
            messages: raw.messages,
            max_tokens,
            temperature,
            task_id: raw.task_id,
        })
    }
}
