//! Prometheus metrics for the provider bridge
//!
//! Tracks:
//! - Request counts by provider, task type and outcome
//! - Latency summaries (avg/p95/p99) by provider and task type
//! - Provider availability
//! - Committee triggers and distribution broadcasts
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.
//! Events arrive through the `MetricsSink` trait, either in-process from the
//! router or over HTTP via `POST /record`.

use prometheus::{
    Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Duration samples kept per (provider, task_type) for the summaries
const DURATION_WINDOW: usize = 1000;

/// Distinct label sets accepted per metric family; `/record` is
/// unauthenticated, so anything past this is dropped
const MAX_LABEL_SERIES: usize = 512;

/// One observability event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricsEvent {
    Request {
        #[serde(default = "unknown")]
        provider: String,
        #[serde(default = "unknown")]
        task_type: String,
        #[serde(default = "unknown")]
        status: String,
        /// Elapsed seconds
        #[serde(default)]
        duration: f64,
    },
    ProviderHealth {
        #[serde(default = "unknown")]
        provider: String,
        #[serde(default = "available_default")]
        available: bool,
    },
    Committee,
    Distribution,
}

fn unknown() -> String {
    "unknown".to_string()
}

fn available_default() -> bool {
    true
}

impl MetricsEvent {
    /// Request event with a `success`/`error` status label
    pub fn request(provider: &str, task_type: &str, success: bool, duration: f64) -> Self {
        Self::Request {
            provider: provider.to_string(),
            task_type: task_type.to_string(),
            status: if success { "success" } else { "error" }.to_string(),
            duration,
        }
    }

    pub fn provider_health(provider: &str, available: bool) -> Self {
        Self::ProviderHealth {
            provider: provider.to_string(),
            available,
        }
    }
}

/// Fire-and-forget event receiver
///
/// Recording never fails from the caller's point of view; implementations
/// log their own errors.
pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _event: MetricsEvent) {}
}

/// Label sets seen so far plus the duration windows behind the summaries
#[derive(Default)]
struct LabelSeries {
    durations: HashMap<(String, String), VecDeque<f64>>,
    requests: HashSet<(String, String, String)>,
    providers: HashSet<String>,
}

fn series_limit_error(family: &str) -> prometheus::Error {
    prometheus::Error::Msg(format!(
        "{} already has {} label sets; dropping new series",
        family, MAX_LABEL_SERIES
    ))
}

/// Metrics collector for the provider bridge
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    duration_avg: GaugeVec,
    duration_p95: GaugeVec,
    duration_p99: GaugeVec,
    provider_availability: IntGaugeVec,
    committee_triggers: IntCounter,
    distribution_broadcasts: IntCounter,
    uptime: Gauge,
    series: Arc<Mutex<LabelSeries>>,
    started: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: providers × categories × 2 outcomes, bounded by config
        let requests_total = IntCounterVec::new(
            Opts::new(
                "bridge_requests_total",
                "Total number of requests routed by the bridge",
            ),
            &["provider", "task_type", "status"],
        )?;

        let duration_avg = GaugeVec::new(
            Opts::new(
                "bridge_request_duration_seconds_avg",
                "Mean request duration in seconds over the recent window",
            ),
            &["provider", "task_type"],
        )?;
        let duration_p95 = GaugeVec::new(
            Opts::new(
                "bridge_request_duration_seconds_p95",
                "95th percentile request duration in seconds over the recent window",
            ),
            &["provider", "task_type"],
        )?;
        let duration_p99 = GaugeVec::new(
            Opts::new(
                "bridge_request_duration_seconds_p99",
                "99th percentile request duration in seconds over the recent window",
            ),
            &["provider", "task_type"],
        )?;

        let provider_availability = IntGaugeVec::new(
            Opts::new(
                "bridge_provider_availability",
                "Provider availability (1=up, 0=cooling down)",
            ),
            &["provider"],
        )?;

        let committee_triggers = IntCounter::with_opts(Opts::new(
            "bridge_committee_triggers_total",
            "Total committee activations",
        ))?;

        let distribution_broadcasts = IntCounter::with_opts(Opts::new(
            "bridge_distribution_broadcasts_total",
            "Total insight broadcasts delivered",
        ))?;

        let uptime = Gauge::with_opts(Opts::new(
            "bridge_uptime_seconds",
            "Seconds since the bridge started",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(duration_avg.clone()))?;
        registry.register(Box::new(duration_p95.clone()))?;
        registry.register(Box::new(duration_p99.clone()))?;
        registry.register(Box::new(provider_availability.clone()))?;
        registry.register(Box::new(committee_triggers.clone()))?;
        registry.register(Box::new(distribution_broadcasts.clone()))?;
        registry.register(Box::new(uptime.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            duration_avg,
            duration_p95,
            duration_p99,
            provider_availability,
            committee_triggers,
            distribution_broadcasts,
            uptime,
            series: Arc::new(Mutex::new(LabelSeries::default())),
            started: Instant::now(),
        })
    }

    /// Record one request outcome and its duration
    ///
    /// # Errors
    ///
    /// Returns an error if `duration` is NaN, infinite or negative; such
    /// samples would corrupt every summary for the label pair.
    pub fn record_request(
        &self,
        provider: &str,
        task_type: &str,
        status: &str,
        duration: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "duration must be finite and non-negative, got: {}",
                duration
            )));
        }

        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        // Every new (provider, task_type) pair also brings a new outcome
        // triple, so this bounds the duration windows too
        let outcome = (
            provider.to_string(),
            task_type.to_string(),
            status.to_string(),
        );
        if !series.requests.contains(&outcome) {
            if series.requests.len() >= MAX_LABEL_SERIES {
                return Err(series_limit_error("bridge_requests_total"));
            }
            series.requests.insert(outcome);
        }

        self.requests_total
            .get_metric_with_label_values(&[provider, task_type, status])?
            .inc();

        let window = series
            .durations
            .entry((provider.to_string(), task_type.to_string()))
            .or_default();
        if window.len() == DURATION_WINDOW {
            window.pop_front();
        }
        window.push_back(duration);
        Ok(())
    }

    pub fn record_provider_health(
        &self,
        provider: &str,
        available: bool,
    ) -> Result<(), prometheus::Error> {
        let mut series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        if !series.providers.contains(provider) {
            if series.providers.len() >= MAX_LABEL_SERIES {
                return Err(series_limit_error("bridge_provider_availability"));
            }
            series.providers.insert(provider.to_string());
        }
        drop(series);

        self.provider_availability
            .get_metric_with_label_values(&[provider])?
            .set(i64::from(available));
        Ok(())
    }

    pub fn committee_trigger(&self) {
        self.committee_triggers.inc();
    }

    pub fn distribution_broadcast(&self) {
        self.distribution_broadcasts.inc();
    }

    /// Current request count for a label set (for testing)
    pub fn requests_count(&self, provider: &str, task_type: &str, status: &str) -> u64 {
        self.requests_total
            .get_metric_with_label_values(&[provider, task_type, status])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current committee trigger count (for testing)
    pub fn committee_triggers_count(&self) -> u64 {
        self.committee_triggers.get()
    }

    /// Current broadcast count (for testing)
    pub fn distribution_broadcasts_count(&self) -> u64 {
        self.distribution_broadcasts.get()
    }

    /// Refresh the derived gauges from the duration windows
    fn refresh_summaries(&self) -> Result<(), prometheus::Error> {
        let series = self.series.lock().unwrap_or_else(|e| e.into_inner());
        for ((provider, task_type), window) in series.durations.iter() {
            let Some(summary) = Summary::from_samples(window.iter().copied()) else {
                continue;
            };
            let labels = [provider.as_str(), task_type.as_str()];
            self.duration_avg
                .get_metric_with_label_values(&labels)?
                .set(summary.avg);
            self.duration_p95
                .get_metric_with_label_values(&labels)?
                .set(summary.p95);
            self.duration_p99
                .get_metric_with_label_values(&labels)?
                .set(summary.p99);
        }
        drop(series);

        self.uptime.set(self.started.elapsed().as_secs_f64().floor());
        Ok(())
    }

    /// Gather all metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        self.refresh_summaries()?;

        let metric_families = self.registry.gather();
        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(error = %e, "Prometheus text encoder failed");
            e
        })?;

        String::from_utf8(buffer).map_err(|e| {
            tracing::error!(error = %e, "Prometheus output is not valid UTF-8");
            prometheus::Error::Msg(format!("invalid UTF-8 in metrics output: {}", e))
        })
    }
}

impl MetricsSink for Metrics {
    fn record(&self, event: MetricsEvent) {
        let result = match &event {
            MetricsEvent::Request {
                provider,
                task_type,
                status,
                duration,
            } => self.record_request(provider, task_type, status, *duration),
            MetricsEvent::ProviderHealth {
                provider,
                available,
            } => self.record_provider_health(provider, *available),
            MetricsEvent::Committee => {
                self.committee_trigger();
                Ok(())
            }
            MetricsEvent::Distribution => {
                self.distribution_broadcast();
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, event = ?event, "Failed to record metrics event");
        }
    }
}

/// Latency summary over one window
#[derive(Debug, Clone, Copy, PartialEq)]
struct Summary {
    avg: f64,
    p95: f64,
    p99: f64,
}

impl Summary {
    fn from_samples(samples: impl Iterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = samples.collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let avg = sorted.iter().sum::<f64>() / sorted.len() as f64;
        Some(Self {
            avg,
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
        })
    }
}

/// Sample at index floor(n × q), clamped to the last element
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() as f64 * q) as usize).min(sorted.len() - 1);
    sorted[idx]
}
