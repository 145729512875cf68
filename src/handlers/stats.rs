//! Routing statistics endpoint
//!
//! GET /stats returns raw performance counters, the current dynamic weights
//! for every declared category and the cooldowns still in force.

use axum::{Json, extract::State};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::handlers::AppState;
use crate::models::{ProviderStats, WeightVector};

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub provider_stats: BTreeMap<String, ProviderStats>,
    /// category → provider weights; empty when every candidate cools down
    pub dynamic_weights: BTreeMap<String, BTreeMap<String, f64>>,
    pub cooldowns: BTreeMap<String, Cooldown>,
}

#[derive(Debug, Serialize)]
pub struct Cooldown {
    pub remaining_seconds: u64,
}

fn weight_map(weights: &WeightVector) -> BTreeMap<String, f64> {
    weights
        .iter()
        .map(|(id, weight)| (id.to_string(), weight))
        .collect()
}

pub async fn handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let router = state.router();
    let tracker = router.state().tracker();

    let provider_stats = tracker
        .all_stats()
        .await
        .into_iter()
        .map(|(id, stats)| (id.to_string(), stats))
        .collect();

    let classifier = router.classifier();
    let mut categories: Vec<_> = classifier.categories().cloned().collect();
    if !categories.contains(classifier.default_category()) {
        categories.push(classifier.default_category().clone());
    }

    let mut dynamic_weights = BTreeMap::new();
    for category in categories {
        let weights = router.selector().weights(&category).await;
        dynamic_weights.insert(category.to_string(), weight_map(&weights));
    }

    let cooldowns = tracker
        .active_cooldowns()
        .await
        .into_iter()
        .map(|(id, remaining)| {
            (
                id.to_string(),
                Cooldown {
                    // Round up so an active cooldown never reports 0
                    remaining_seconds: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
                },
            )
        })
        .collect();

    Json(StatsResponse {
        provider_stats,
        dynamic_weights,
        cooldowns,
    })
}
