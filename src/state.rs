//! Shared mutable routing state
//!
//! Owned by the router and injected at construction. Each table carries its
//! own lock; nothing here performs network I/O.

use crate::cache::DeduplicationCache;
use crate::config::Config;
use crate::models::PerformanceTracker;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RoutingState {
    tracker: Arc<PerformanceTracker>,
    cache: Arc<DeduplicationCache>,
}

impl RoutingState {
    pub fn new(config: &Config) -> Self {
        Self {
            tracker: Arc::new(PerformanceTracker::new(&config.tracking)),
            cache: Arc::new(DeduplicationCache::new(&config.cache)),
        }
    }

    pub fn tracker(&self) -> &Arc<PerformanceTracker> {
        &self.tracker
    }

    pub fn cache(&self) -> &DeduplicationCache {
        &self.cache
    }
}
