//! HTTP request handlers for the provider bridge

use crate::config::Config;
use crate::distributor::{self, Distributor};
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::models::{HttpAdapter, ProviderAdapter};
use crate::router::AdaptiveRouter;
use crate::state::RoutingState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod anthropic;
pub mod chat;
pub mod extractor;
pub mod health;
pub mod metrics;
pub mod stats;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    router: Arc<AdaptiveRouter>,
    metrics: Metrics,
}

impl AppState {
    /// Create state with the HTTP adapter and the configured distributor
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client or metrics registry
    /// cannot be built.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;
        let adapter = Arc::new(HttpAdapter::new(client.clone()));
        let distributor = distributor::from_config(&config.distributor, client);
        Self::with_collaborators(config, adapter, distributor)
    }

    /// Create state with explicit adapter and distributor
    pub fn with_collaborators(
        config: Arc<Config>,
        adapter: Arc<dyn ProviderAdapter>,
        distributor: Arc<dyn Distributor>,
    ) -> AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("failed to register metrics: {}", e)))?;
        let router = AdaptiveRouter::new(
            config.clone(),
            RoutingState::new(&config),
            adapter,
            Arc::new(metrics.clone()),
            distributor,
        );

        for provider in &config.providers {
            // Every declared provider starts out available
            metrics
                .record_provider_health(provider.id(), true)
                .map_err(|e| AppError::Internal(format!("failed to seed metrics: {}", e)))?;
        }

        Ok(Self {
            config,
            router: Arc::new(router),
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &AdaptiveRouter {
        &self.router
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the Axum application with every route and layer
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat::handler))
        .route("/v1/anthropic/messages", post(anthropic::handler))
        .route("/health", get(health::handler))
        .route("/stats", get(stats::handler))
        .route("/metrics", get(metrics::handler))
        .route("/record", post(metrics::record_handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
