//! Provider selection
//!
//! Picks the highest-weighted available provider for a category. Cooldown
//! is a preference, not a hard block: when nothing is available the
//! selector still returns a provider so the request is attempted.

use crate::config::Config;
use crate::models::{ExclusionSet, PerformanceTracker, ProviderId, WeightEngine, WeightVector};
use crate::router::TaskCategory;
use std::sync::Arc;

/// Selects a provider for a request
#[derive(Debug)]
pub struct ProviderSelector {
    config: Arc<Config>,
    tracker: Arc<PerformanceTracker>,
    weights: WeightEngine,
}

impl ProviderSelector {
    pub fn new(config: Arc<Config>, tracker: Arc<PerformanceTracker>) -> Self {
        let weights = WeightEngine::new(config.clone(), tracker.clone());
        Self {
            config,
            tracker,
            weights,
        }
    }

    /// Current weights for a category
    pub async fn weights(&self, category: &TaskCategory) -> WeightVector {
        self.weights.compute_weights(category).await
    }

    /// Select one provider for the category
    ///
    /// Order of preference:
    /// 1. Highest weight (earliest declared on ties)
    /// 2. First available provider in declared order
    /// 3. First declared provider, even if cooling down
    ///
    /// Returns `None` only when no providers are configured.
    pub async fn select(&self, category: &TaskCategory) -> Option<ProviderId> {
        let weights = self.weights.compute_weights(category).await;
        if let Some(best) = weights.best() {
            tracing::debug!(
                category = %category,
                provider = %best,
                weight = weights.get(best).unwrap_or_default(),
                "Selected provider by weight"
            );
            return Some(best.clone());
        }

        if let Some(first) = self.available(&ExclusionSet::new()).await.into_iter().next() {
            tracing::debug!(
                category = %category,
                provider = %first,
                "No weighted candidate available, using first available provider"
            );
            return Some(first);
        }

        let forced = self.all().into_iter().next()?;
        tracing::warn!(
            category = %category,
            provider = %forced,
            "All providers cooling down, forcing selection"
        );
        Some(forced)
    }

    /// Available providers in declared order, minus the exclusions
    pub async fn available(&self, exclude: &ExclusionSet) -> Vec<ProviderId> {
        let mut available = Vec::new();
        for provider in &self.config.providers {
            let id = ProviderId::from(provider);
            if exclude.contains(&id) {
                continue;
            }
            if self.tracker.is_available(&id).await {
                available.push(id);
            }
        }
        available
    }

    /// Every declared provider in declared order
    pub fn all(&self) -> Vec<ProviderId> {
        self.config.providers.iter().map(ProviderId::from).collect()
    }
}
