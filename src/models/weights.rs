//! Performance-adjusted selection weights
//!
//! Base weights come from the category policy (or the default set) and are
//! scaled by each provider's live success rate and latency, then normalized
//! over the available providers.

use crate::config::Config;
use crate::models::{PerformanceTracker, ProviderId};
use crate::router::TaskCategory;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Latency assumed for a provider with no samples
const DEFAULT_LATENCY: Duration = Duration::from_secs(2);
/// Reference latency in seconds; faster providers earn a bonus
const LATENCY_REFERENCE_SECS: f64 = 3.0;
const MIN_LATENCY_PENALTY: f64 = 0.5;
const MAX_LATENCY_PENALTY: f64 = 1.5;
/// Floor for an available provider's adjusted weight
const MIN_WEIGHT: f64 = 0.01;

/// Normalized provider weights for one category, in declared provider order
///
/// Unavailable providers carry weight 0. An empty vector means every
/// candidate is cooling down.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightVector {
    entries: Vec<(ProviderId, f64)>,
}

impl WeightVector {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Weight for a provider, `None` if it is not a candidate
    pub fn get(&self, provider: &ProviderId) -> Option<f64> {
        self.entries
            .iter()
            .find(|(id, _)| id == provider)
            .map(|(_, weight)| *weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProviderId, f64)> {
        self.entries.iter().map(|(id, weight)| (id, *weight))
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    /// Highest-weighted provider; the earliest declared wins ties
    pub fn best(&self) -> Option<&ProviderId> {
        let mut best: Option<(&ProviderId, f64)> = None;
        for (id, weight) in &self.entries {
            if *weight <= 0.0 {
                continue;
            }
            match best {
                Some((_, top)) if *weight <= top => {}
                _ => best = Some((id, *weight)),
            }
        }
        best.map(|(id, _)| id)
    }
}

/// Derives selection weights from policy and live performance
#[derive(Debug)]
pub struct WeightEngine {
    config: Arc<Config>,
    tracker: Arc<PerformanceTracker>,
}

impl WeightEngine {
    pub fn new(config: Arc<Config>, tracker: Arc<PerformanceTracker>) -> Self {
        Self { config, tracker }
    }

    /// Compute the weight vector for a category
    pub async fn compute_weights(&self, category: &TaskCategory) -> WeightVector {
        let routing = &self.config.routing;
        let base = match routing.category(category.as_str()) {
            Some(policy) if !policy.weights.is_empty() => &policy.weights,
            _ => &routing.default_weights,
        };

        let mut adjusted = Vec::new();
        for provider in &self.config.providers {
            let Some(&base_weight) = base.get(provider.id()) else {
                continue;
            };
            let id = ProviderId::from(provider);

            if !self.tracker.is_available(&id).await {
                adjusted.push((id, 0.0));
                continue;
            }

            let (success_rate, avg_latency) = match self.tracker.record(&id).await {
                Some(record) => (
                    record.success_rate(),
                    record.average_latency().unwrap_or(DEFAULT_LATENCY),
                ),
                None => (1.0, DEFAULT_LATENCY),
            };

            let weight = adjust_weight(base_weight, success_rate, avg_latency);
            adjusted.push((id, weight));
        }

        let total: f64 = adjusted.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            tracing::debug!(
                category = %category,
                "No available providers for category, weights empty"
            );
            return WeightVector::default();
        }

        let entries = adjusted
            .into_iter()
            .map(|(id, weight)| (id, weight / total))
            .collect();
        WeightVector { entries }
    }
}

/// base × success_rate × latency_penalty, floored at `MIN_WEIGHT`
fn adjust_weight(base_weight: f64, success_rate: f64, avg_latency: Duration) -> f64 {
    let latency_secs = avg_latency.as_secs_f64();
    let penalty = if latency_secs > 0.0 {
        (LATENCY_REFERENCE_SECS / latency_secs).clamp(MIN_LATENCY_PENALTY, MAX_LATENCY_PENALTY)
    } else {
        MAX_LATENCY_PENALTY
    };
    (base_weight * success_rate * penalty).max(MIN_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 7010

[[routing.categories]]
name = "coding"
keywords = ["code"]
weights = { openai = 0.5, claude = 0.3, llama = 0.2 }

[[routing.categories]]
name = "empty"
keywords = ["nothing"]

[[providers]]
id = "llama"
type = "openai-compatible"
base_url = "http://localhost:9001/v1"
model = "llama3"

[[providers]]
id = "openai"
type = "openai"
base_url = "http://localhost:9002/v1"
model = "gpt"

[[providers]]
id = "claude"
type = "anthropic"
base_url = "http://localhost:9003/v1"
model = "claude"
"#;

    fn engine() -> (WeightEngine, Arc<PerformanceTracker>) {
        let config = Arc::new(Config::from_str(CONFIG).unwrap());
        let tracker = Arc::new(PerformanceTracker::new(&config.tracking));
        (WeightEngine::new(config, tracker.clone()), tracker)
    }

    fn coding() -> TaskCategory {
        TaskCategory::new("coding")
    }

    async fn cool_down(tracker: &PerformanceTracker, id: &str) {
        for _ in 0..3 {
            tracker
                .record_result(&ProviderId::from(id), false, Duration::from_secs(1))
                .await;
        }
    }

    #[tokio::test]
    async fn test_fresh_weights_follow_base_proportions() {
        let (engine, _) = engine();
        let weights = engine.compute_weights(&coding()).await;

        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert!((weights.get(&"openai".into()).unwrap() - 0.5).abs() < 1e-9);
        assert!((weights.get(&"claude".into()).unwrap() - 0.3).abs() < 1e-9);
        assert!((weights.get(&"llama".into()).unwrap() - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_entries_follow_declared_provider_order() {
        let (engine, _) = engine();
        let weights = engine.compute_weights(&coding()).await;
        let order: Vec<_> = weights.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["llama", "openai", "claude"]);
    }

    #[tokio::test]
    async fn test_unavailable_provider_gets_zero_and_rest_renormalize() {
        let (engine, tracker) = engine();
        cool_down(&tracker, "openai").await;

        let weights = engine.compute_weights(&coding()).await;
        assert_eq!(weights.get(&"openai".into()), Some(0.0));
        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert_eq!(weights.best().map(|id| id.as_str()), Some("claude"));
    }

    #[tokio::test]
    async fn test_all_unavailable_yields_empty_vector() {
        let (engine, tracker) = engine();
        for id in ["llama", "openai", "claude"] {
            cool_down(&tracker, id).await;
        }
        assert!(engine.compute_weights(&coding()).await.is_empty());
    }

    #[tokio::test]
    async fn test_undeclared_category_uses_default_weights() {
        let (engine, _) = engine();
        let weights = engine.compute_weights(&TaskCategory::new("planning")).await;

        // Default set is llama 0.4, mistral 0.3, openai 0.2, claude 0.1; mistral is not declared
        assert_eq!(weights.len(), 3);
        assert!((weights.get(&"llama".into()).unwrap() - 0.4 / 0.7).abs() < 1e-9);
        assert_eq!(weights.get(&"mistral".into()), None);
    }

    #[tokio::test]
    async fn test_category_without_weights_uses_default_weights() {
        let (engine, _) = engine();
        let weights = engine.compute_weights(&TaskCategory::new("empty")).await;
        assert_eq!(weights.best().map(|id| id.as_str()), Some("llama"));
    }

    #[tokio::test]
    async fn test_failures_lower_success_rate_weight() {
        let (engine, tracker) = engine();
        let openai = ProviderId::from("openai");
        tracker.record_result(&openai, true, Duration::from_secs(2)).await;
        tracker.record_result(&openai, false, Duration::from_secs(2)).await;

        let weights = engine.compute_weights(&coding()).await;
        // openai: 0.5 * 0.5 * 1.5 = 0.375; claude: 0.3 * 1.5 = 0.45; llama: 0.2 * 1.5 = 0.3
        assert_eq!(weights.best().map(|id| id.as_str()), Some("claude"));
        let total = 0.375 + 0.45 + 0.3;
        assert!((weights.get(&openai).unwrap() - 0.375 / total).abs() < 1e-9);
    }

    #[test]
    fn test_latency_penalty_is_clamped() {
        // 3.0 / 1.0 = 3.0 clamps to 1.5
        assert!((adjust_weight(1.0, 1.0, Duration::from_secs(1)) - 1.5).abs() < 1e-12);
        // 3.0 / 12.0 = 0.25 clamps to 0.5
        assert!((adjust_weight(1.0, 1.0, Duration::from_secs(12)) - 0.5).abs() < 1e-12);
        // 3.0 / 4.0 = 0.75 stays
        assert!((adjust_weight(1.0, 1.0, Duration::from_secs(4)) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_adjusted_weight_is_floored() {
        assert_eq!(adjust_weight(0.0, 1.0, Duration::from_secs(2)), MIN_WEIGHT);
        assert_eq!(adjust_weight(0.5, 0.0, Duration::from_secs(2)), MIN_WEIGHT);
    }

    #[test]
    fn test_best_breaks_ties_by_declared_order() {
        let weights = WeightVector {
            entries: vec![
                ("b".into(), 0.0),
                ("a".into(), 0.4),
                ("c".into(), 0.4),
                ("d".into(), 0.2),
            ],
        };
        assert_eq!(weights.best().map(|id| id.as_str()), Some("a"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn weights_sum_to_one_when_any_available(
                outcomes in proptest::collection::vec((0usize..3, any::<bool>(), 1u64..20_000), 0..40),
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                runtime.block_on(async {
                    let (engine, tracker) = engine();
                    let ids = ["llama", "openai", "claude"];
                    for (idx, success, latency_ms) in &outcomes {
                        tracker
                            .record_result(
                                &ProviderId::from(ids[*idx]),
                                *success,
                                Duration::from_millis(*latency_ms),
                            )
                            .await;
                    }

                    let mut any_available = false;
                    for id in ids {
                        any_available |= tracker.is_available(&ProviderId::from(id)).await;
                    }

                    let weights = engine.compute_weights(&coding()).await;
                    if any_available {
                        prop_assert!((weights.total() - 1.0).abs() < 1e-6);
                    } else {
                        prop_assert!(weights.is_empty());
                    }
                    Ok(())
                })?;
            }
        }
    }
}
