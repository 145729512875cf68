//! Health check endpoint
//!
//! Reports the routing mode and, per declared provider, availability and
//! performance counters.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::handlers::AppState;
use crate::models::ProviderStats;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: &'static str,
    pub providers: BTreeMap<String, ProviderHealth>,
}

#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub available: bool,
    pub stats: ProviderStats,
}

pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let router = state.router();
    let tracker = router.state().tracker();

    let mut providers = BTreeMap::new();
    for id in router.selector().all() {
        let health = ProviderHealth {
            available: tracker.is_available(&id).await,
            stats: tracker.stats(&id).await,
        };
        providers.insert(id.to_string(), health);
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            mode: router.mode().as_str(),
            providers,
        }),
    )
}
