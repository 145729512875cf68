//! Insight distributor
//!
//! Fire-and-forget notification sent after a routed call completes. A
//! failed notification is logged and otherwise ignored.

use crate::config::DistributorConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of prompt characters carried in a notification
pub const PREVIEW_CHARS: usize = 160;

/// Notification payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub topic: String,
    pub kind: String,
    pub provider: String,
    pub preview: String,
}

impl Insight {
    /// Build an insight, truncating the preview to `PREVIEW_CHARS`
    pub fn new(
        topic: impl Into<String>,
        kind: impl Into<String>,
        provider: impl Into<String>,
        preview: &str,
    ) -> Self {
        Self {
            topic: topic.into(),
            kind: kind.into(),
            provider: provider.into(),
            preview: preview.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Receives insight notifications
#[async_trait]
pub trait Distributor: Send + Sync {
    /// Topic stamped on every notification
    fn topic(&self) -> &str;

    /// Send one notification; `true` only if it was delivered
    async fn notify(&self, insight: &Insight) -> bool;
}

/// Distributor that drops every notification
#[derive(Debug, Clone)]
pub struct NoopDistributor {
    topic: String,
}

impl NoopDistributor {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl Distributor for NoopDistributor {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn notify(&self, _insight: &Insight) -> bool {
        false
    }
}

/// Posts insights as JSON to a broadcast endpoint
#[derive(Debug, Clone)]
pub struct HttpDistributor {
    client: reqwest::Client,
    url: String,
    topic: String,
    timeout: Duration,
}

impl HttpDistributor {
    pub fn new(client: reqwest::Client, url: impl Into<String>, config: &DistributorConfig) -> Self {
        Self {
            client,
            url: url.into(),
            topic: config.topic.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

#[async_trait]
impl Distributor for HttpDistributor {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn notify(&self, insight: &Insight) -> bool {
        let result = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(insight)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(
                    kind = %insight.kind,
                    provider = %insight.provider,
                    "Insight broadcast"
                );
                true
            }
            Ok(response) => {
                tracing::debug!(
                    status = response.status().as_u16(),
                    url = %self.url,
                    "Insight broadcast rejected"
                );
                false
            }
            Err(e) => {
                tracing::debug!(error = %e, url = %self.url, "Insight broadcast failed");
                false
            }
        }
    }
}

/// Build the distributor described by the configuration
///
/// Disabled (or URL-less) configurations yield a no-op distributor.
pub fn from_config(config: &DistributorConfig, client: reqwest::Client) -> Arc<dyn Distributor> {
    match config.broadcast_url.as_deref() {
        Some(url) if config.enabled => Arc::new(HttpDistributor::new(client, url, config)),
        _ => Arc::new(NoopDistributor::new(config.topic.clone())),
    }
}
