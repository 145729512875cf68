//! Adaptive router
//!
//! Per request: classify, consult the cache, then either call the selected
//! provider (adaptive/hybrid) or go straight to the committee. A bad status
//! or a sensitive marker escalates the adaptive path to the committee; an
//! adapter error retries on the committee without the failed provider.

use crate::cache::Fingerprint;
use crate::config::Config;
use crate::distributor::{Distributor, Insight};
use crate::error::{AppError, AppResult};
use crate::metrics::{MetricsEvent, MetricsSink};
use crate::middleware::request_id::RequestId;
use crate::models::{
    CompletionRequest, ExclusionSet, ProviderAdapter, ProviderId, ProviderSelector,
};
use crate::router::{
    CommitteeAggregator, CommitteeVerdict, ProviderDispatcher, RoutingMode, TaskCategory,
    TaskClassifier,
};
use crate::state::RoutingState;
use std::sync::Arc;
use tokio::time::Instant;

/// Provider label used in events for committee results
const COMMITTEE_LABEL: &str = "committee";
/// Event kind and preview for the fixed Anthropic endpoint
const ANTHROPIC_KIND: &str = "anthropic";
const ANTHROPIC_PREVIEW: &str = "anthropic-call";

/// Where a routed response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Primary,
    Committee,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Primary => "primary",
            Self::Committee => "committee",
        }
    }
}

/// Response to hand back to the caller unchanged
#[derive(Debug, Clone)]
pub struct RoutedResponse {
    pub status: u16,
    pub body: String,
    /// Provider that produced the body; `None` for cache hits
    pub provider: Option<ProviderId>,
    pub category: TaskCategory,
    pub source: ResponseSource,
}

impl RoutedResponse {
    fn from_verdict(verdict: CommitteeVerdict, category: TaskCategory) -> Self {
        Self {
            status: verdict.status(),
            provider: Some(verdict.winner.provider),
            body: verdict.winner.body,
            category,
            source: ResponseSource::Committee,
        }
    }
}

/// Orchestrates classification, selection, escalation and retry
pub struct AdaptiveRouter {
    config: Arc<Config>,
    classifier: TaskClassifier,
    selector: ProviderSelector,
    dispatcher: Arc<ProviderDispatcher>,
    committee: CommitteeAggregator,
    state: RoutingState,
    metrics: Arc<dyn MetricsSink>,
    distributor: Arc<dyn Distributor>,
}

impl AdaptiveRouter {
    pub fn new(
        config: Arc<Config>,
        state: RoutingState,
        adapter: Arc<dyn ProviderAdapter>,
        metrics: Arc<dyn MetricsSink>,
        distributor: Arc<dyn Distributor>,
    ) -> Self {
        let tracker = state.tracker().clone();
        let dispatcher = Arc::new(ProviderDispatcher::new(
            config.clone(),
            adapter,
            tracker.clone(),
            metrics.clone(),
        ));

        Self {
            classifier: TaskClassifier::new(&config.routing),
            selector: ProviderSelector::new(config.clone(), tracker.clone()),
            committee: CommitteeAggregator::new(dispatcher.clone(), tracker),
            dispatcher,
            config,
            state,
            metrics,
            distributor,
        }
    }

    pub fn mode(&self) -> RoutingMode {
        self.config.routing.mode
    }

    pub fn state(&self) -> &RoutingState {
        &self.state
    }

    pub fn classifier(&self) -> &TaskClassifier {
        &self.classifier
    }

    pub fn selector(&self) -> &ProviderSelector {
        &self.selector
    }

    /// Route one chat-completion request
    pub async fn route(
        &self,
        request: &CompletionRequest,
        request_id: RequestId,
    ) -> AppResult<RoutedResponse> {
        let prompt = request.prompt_text();
        let category = self.classifier.classify(&prompt);
        let fingerprint = self.state.cache().fingerprint(&prompt, &category);

        if let Some(body) = self.state.cache().get(&fingerprint) {
            tracing::info!(
                request_id = %request_id,
                task_type = %category,
                fingerprint = %fingerprint,
                "Cache hit"
            );
            return Ok(RoutedResponse {
                status: 200,
                body,
                provider: None,
                category,
                source: ResponseSource::Cache,
            });
        }

        match self.mode() {
            RoutingMode::Adaptive | RoutingMode::Hybrid => {
                self.route_adaptive(request, request_id, &prompt, category, fingerprint)
                    .await
            }
            RoutingMode::Committee => {
                tracing::info!(
                    request_id = %request_id,
                    task_type = %category,
                    "Committee mode, fanning out to every provider"
                );
                let members = self.selector.all();
                let verdict = self
                    .run_committee(&members, request, &category, &prompt)
                    .await?;
                Ok(RoutedResponse::from_verdict(verdict, category))
            }
        }
    }

    async fn route_adaptive(
        &self,
        request: &CompletionRequest,
        request_id: RequestId,
        prompt: &str,
        category: TaskCategory,
        fingerprint: Fingerprint,
    ) -> AppResult<RoutedResponse> {
        let provider = self.selector.select(&category).await.ok_or_else(|| {
            AppError::AllProvidersFailed("no providers configured".to_string())
        })?;

        tracing::info!(
            request_id = %request_id,
            task_type = %category,
            provider = %provider,
            "Routing request"
        );

        let started = Instant::now();
        let result = self.dispatcher.call(&provider, request).await;
        let elapsed = started.elapsed().as_secs_f64();

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                self.metrics.record(MetricsEvent::request(
                    provider.as_str(),
                    category.as_str(),
                    false,
                    elapsed,
                ));

                let mut exclude = ExclusionSet::new();
                exclude.insert(provider.clone());
                let members = self.selector.available(&exclude).await;
                if members.is_empty() {
                    tracing::error!(
                        request_id = %request_id,
                        provider = %provider,
                        error = %e,
                        "Provider call failed and no other provider is available"
                    );
                    return Err(e);
                }

                tracing::warn!(
                    request_id = %request_id,
                    provider = %provider,
                    error = %e,
                    remaining = members.len(),
                    "Provider call failed, retrying on committee"
                );
                let verdict = self
                    .run_committee(&members, request, &category, prompt)
                    .await?;
                return Ok(RoutedResponse::from_verdict(verdict, category));
            }
        };

        let success = reply.is_success();
        self.metrics.record(MetricsEvent::request(
            provider.as_str(),
            category.as_str(),
            success,
            elapsed,
        ));

        if success {
            self.state.cache().put(fingerprint, reply.body.clone());
            self.broadcast(category.as_str(), provider.as_str(), prompt)
                .await;
        }

        let sensitive = self.is_sensitive(request, prompt);
        if !success || sensitive {
            tracing::info!(
                request_id = %request_id,
                provider = %provider,
                status = reply.status,
                sensitive,
                "Escalating to committee"
            );
            let mut members = self.selector.available(&ExclusionSet::new()).await;
            if members.is_empty() {
                members = self.selector.all();
            }
            let verdict = self
                .run_committee(&members, request, &category, prompt)
                .await?;
            return Ok(RoutedResponse::from_verdict(verdict, category));
        }

        Ok(RoutedResponse {
            status: reply.status,
            body: reply.body,
            provider: Some(provider),
            category,
            source: ResponseSource::Primary,
        })
    }

    /// Route to the designated Anthropic provider, bypassing selection
    pub async fn route_anthropic(
        &self,
        request: &CompletionRequest,
        request_id: RequestId,
    ) -> AppResult<RoutedResponse> {
        let provider = ProviderId::from(self.config.routing.anthropic_provider.as_str());
        let category = TaskCategory::new(ANTHROPIC_KIND);
        tracing::info!(
            request_id = %request_id,
            provider = %provider,
            "Routing to designated Anthropic provider"
        );

        let started = Instant::now();
        let result = self.dispatcher.call(&provider, request).await;
        let elapsed = started.elapsed().as_secs_f64();

        let success = matches!(&result, Ok(reply) if reply.is_success());
        self.metrics.record(MetricsEvent::request(
            provider.as_str(),
            category.as_str(),
            success,
            elapsed,
        ));

        let reply = result?;
        if success {
            self.broadcast(ANTHROPIC_KIND, provider.as_str(), ANTHROPIC_PREVIEW)
                .await;
        }

        Ok(RoutedResponse {
            status: reply.status,
            body: reply.body,
            provider: Some(provider),
            category,
            source: ResponseSource::Primary,
        })
    }

    async fn run_committee(
        &self,
        members: &[ProviderId],
        request: &CompletionRequest,
        category: &TaskCategory,
        prompt: &str,
    ) -> AppResult<CommitteeVerdict> {
        let started = Instant::now();
        let verdict = self.committee.run(members, request).await?;
        let elapsed = started.elapsed().as_secs_f64();

        self.metrics.record(MetricsEvent::Committee);
        self.metrics.record(MetricsEvent::request(
            COMMITTEE_LABEL,
            category.as_str(),
            verdict.succeeded(),
            elapsed,
        ));
        self.broadcast(category.as_str(), COMMITTEE_LABEL, prompt)
            .await;

        Ok(verdict)
    }

    /// Sensitive markers are matched against task_id and prompt concatenated
    /// with no separator, so a marker may straddle the two.
    fn is_sensitive(&self, request: &CompletionRequest, prompt: &str) -> bool {
        let markers = &self.config.routing.sensitive_tasks;
        if markers.is_empty() {
            return false;
        }
        let haystack = format!("{}{}", request.task_id().unwrap_or_default(), prompt);
        markers
            .iter()
            .any(|marker| !marker.is_empty() && haystack.contains(marker.as_str()))
    }

    async fn broadcast(&self, kind: &str, provider: &str, preview: &str) {
        let insight = Insight::new(self.distributor.topic(), kind, provider, preview);
        if self.distributor.notify(&insight).await {
            self.metrics.record(MetricsEvent::Distribution);
        }
    }
}
