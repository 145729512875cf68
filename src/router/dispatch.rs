//! Single provider call with timeout and performance accounting
//!
//! Every outbound call goes through `ProviderDispatcher::call`, so the
//! performance record and availability gauge stay in step with what was
//! actually sent.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::{MetricsEvent, MetricsSink};
use crate::models::{
    AdapterError, CompletionRequest, PerformanceTracker, ProviderAdapter, ProviderId,
    ProviderReply,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Calls one provider and records the outcome
pub struct ProviderDispatcher {
    config: Arc<Config>,
    adapter: Arc<dyn ProviderAdapter>,
    tracker: Arc<PerformanceTracker>,
    metrics: Arc<dyn MetricsSink>,
    timeout: Duration,
}

impl ProviderDispatcher {
    pub fn new(
        config: Arc<Config>,
        adapter: Arc<dyn ProviderAdapter>,
        tracker: Arc<PerformanceTracker>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let timeout = Duration::from_secs(config.server.request_timeout_seconds);
        Self {
            config,
            adapter,
            tracker,
            metrics,
            timeout,
        }
    }

    /// Call a provider once
    ///
    /// A reply with a non-2xx status is still `Ok`; callers decide whether
    /// to escalate. Transport failures, timeouts and unsupported adapter
    /// types are `Err`. Either way the outcome is recorded before returning.
    pub async fn call(
        &self,
        provider: &ProviderId,
        request: &CompletionRequest,
    ) -> AppResult<ProviderReply> {
        let Some(provider_config) = self.config.provider(provider.as_str()) else {
            return Err(AppError::Internal(format!(
                "provider '{}' is not configured",
                provider
            )));
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.adapter.call(provider_config, request))
            .await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(AdapterError::UnsupportedType { kind })) => {
                Err(AppError::UnsupportedAdapterType {
                    provider: provider.to_string(),
                    kind,
                })
            }
            Ok(Err(AdapterError::Transport(reason))) => Err(AppError::ProviderCallFailed {
                provider: provider.to_string(),
                reason,
            }),
            Err(_) => Err(AppError::ProviderTimeout {
                provider: provider.to_string(),
                timeout_seconds: self.timeout.as_secs(),
            }),
        };

        let success = matches!(&result, Ok(reply) if reply.is_success());
        self.tracker.record_result(provider, success, elapsed).await;
        let available = self.tracker.is_available(provider).await;
        self.metrics
            .record(MetricsEvent::provider_health(provider.as_str(), available));

        match &result {
            Ok(reply) => tracing::debug!(
                provider = %provider,
                status = reply.status,
                latency_ms = elapsed.as_millis() as u64,
                "Provider call completed"
            ),
            Err(e) => tracing::warn!(
                provider = %provider,
                error = %e,
                latency_ms = elapsed.as_millis() as u64,
                "Provider call failed"
            ),
        }

        result
    }
}
