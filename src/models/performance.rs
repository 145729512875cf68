//! Live performance tracking and cooldown for providers
//!
//! Records are created lazily on a provider's first call and kept for the
//! life of the process. Reaching the consecutive-failure threshold puts the
//! provider in cooldown; cooldowns expire by clock comparison alone.

use crate::config::TrackingConfig;
use crate::models::ProviderId;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Counters for a single provider
///
/// Fields are private so the consecutive-failure invariant (reset on any
/// success) is only maintained through `record()`.
#[derive(Clone, Debug)]
pub struct PerformanceRecord {
    success: u64,
    failure: u64,
    consecutive_failures: u32,
    latencies: VecDeque<Duration>,
    capacity: usize,
}

impl PerformanceRecord {
    fn new(capacity: usize) -> Self {
        Self {
            success: 0,
            failure: 0,
            consecutive_failures: 0,
            latencies: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn record(&mut self, success: bool, latency: Duration) {
        if success {
            self.success += 1;
            self.consecutive_failures = 0;
        } else {
            self.failure += 1;
            self.consecutive_failures += 1;
        }

        if self.latencies.len() == self.capacity {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
    }

    pub fn success(&self) -> u64 {
        self.success
    }

    pub fn failure(&self) -> u64 {
        self.failure
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// success / (success + failure), or 1.0 with no observations
    pub fn success_rate(&self) -> f64 {
        let total = self.success + self.failure;
        if total == 0 {
            1.0
        } else {
            self.success as f64 / total as f64
        }
    }

    /// Mean of the latency window, `None` when empty
    pub fn average_latency(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: Duration = self.latencies.iter().sum();
        Some(total / self.latencies.len() as u32)
    }

    pub fn latency_samples(&self) -> usize {
        self.latencies.len()
    }
}

/// Serializable view of a provider's counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStats {
    pub success: u64,
    pub failure: u64,
    pub consecutive_failures: u32,
    pub avg_latency_seconds: Option<f64>,
    pub latency_samples: usize,
}

impl From<&PerformanceRecord> for ProviderStats {
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            success: record.success,
            failure: record.failure,
            consecutive_failures: record.consecutive_failures,
            avg_latency_seconds: record.average_latency().map(|d| d.as_secs_f64()),
            latency_samples: record.latencies.len(),
        }
    }
}

impl Default for ProviderStats {
    fn default() -> Self {
        Self {
            success: 0,
            failure: 0,
            consecutive_failures: 0,
            avg_latency_seconds: None,
            latency_samples: 0,
        }
    }
}

/// Concurrency-safe performance and cooldown tables
///
/// The two tables have independent locks; neither is ever held across an
/// outbound call. Writers always take `records` before `cooldowns`.
#[derive(Debug)]
pub struct PerformanceTracker {
    records: RwLock<HashMap<ProviderId, PerformanceRecord>>,
    cooldowns: RwLock<HashMap<ProviderId, Instant>>,
    failure_threshold: u32,
    cooldown: Duration,
    latency_window: usize,
}

impl PerformanceTracker {
    pub fn new(tracking: &TrackingConfig) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            cooldowns: RwLock::new(HashMap::new()),
            failure_threshold: tracking.failure_threshold,
            cooldown: Duration::from_secs(tracking.cooldown_seconds),
            latency_window: tracking.latency_window.max(1),
        }
    }

    /// Record the outcome of one call
    ///
    /// Returns `true` when this failure put the provider into cooldown.
    pub async fn record_result(
        &self,
        provider: &ProviderId,
        success: bool,
        latency: Duration,
    ) -> bool {
        let mut records = self.records.write().await;
        let record = records
            .entry(provider.clone())
            .or_insert_with(|| PerformanceRecord::new(self.latency_window));
        let previous_failures = record.consecutive_failures;
        record.record(success, latency);

        if success && previous_failures >= self.failure_threshold {
            tracing::info!(
                provider = %provider,
                previous_failures,
                "Provider recovered after cooldown"
            );
            return false;
        }

        if success || record.consecutive_failures < self.failure_threshold {
            tracing::debug!(
                provider = %provider,
                success,
                latency_ms = latency.as_millis() as u64,
                consecutive_failures = record.consecutive_failures,
                "Provider result recorded"
            );
            return false;
        }

        let consecutive_failures = record.consecutive_failures;
        let until = Instant::now() + self.cooldown;
        self.cooldowns.write().await.insert(provider.clone(), until);

        tracing::warn!(
            provider = %provider,
            consecutive_failures,
            cooldown_seconds = self.cooldown.as_secs(),
            "Provider in cooldown after repeated failures"
        );
        true
    }

    /// True iff the provider has no active cooldown
    pub async fn is_available(&self, provider: &ProviderId) -> bool {
        let cooldowns = self.cooldowns.read().await;
        match cooldowns.get(provider) {
            Some(until) => Instant::now() >= *until,
            None => true,
        }
    }

    /// Snapshot of one provider's record (default when never called)
    pub async fn record(&self, provider: &ProviderId) -> Option<PerformanceRecord> {
        self.records.read().await.get(provider).cloned()
    }

    /// Serializable counters for one provider
    pub async fn stats(&self, provider: &ProviderId) -> ProviderStats {
        self.records
            .read()
            .await
            .get(provider)
            .map(ProviderStats::from)
            .unwrap_or_default()
    }

    /// Serializable counters for every provider that has been called
    pub async fn all_stats(&self) -> HashMap<ProviderId, ProviderStats> {
        self.records
            .read()
            .await
            .iter()
            .map(|(id, record)| (id.clone(), ProviderStats::from(record)))
            .collect()
    }

    /// Cooldowns still in force, with their remaining duration
    ///
    /// Expired entries stay in the table but are not reported.
    pub async fn active_cooldowns(&self) -> HashMap<ProviderId, Duration> {
        let now = Instant::now();
        self.cooldowns
            .read()
            .await
            .iter()
            .filter(|(_, until)| **until > now)
            .map(|(id, until)| (id.clone(), *until - now))
            .collect()
    }
}
