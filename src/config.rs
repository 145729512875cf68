//! Configuration management for the provider bridge
//!
//! Parses TOML configuration files into an immutable routing policy.

use crate::error::{AppError, AppResult};
use crate::router::RoutingMode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub distributor: DistributorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Timeout applied to every outbound provider call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    60
}

/// Routing policy: mode, task categories and their base weights
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub mode: RoutingMode,
    /// Category used when no keyword matches
    #[serde(default = "default_category")]
    pub default_category: String,
    /// Provider that serves `/v1/anthropic/messages`
    #[serde(default = "default_anthropic_provider")]
    pub anthropic_provider: String,
    /// Marker terms that force committee escalation
    #[serde(default)]
    pub sensitive_tasks: Vec<String>,
    /// Base weights for categories that declare none
    #[serde(default = "default_weights")]
    pub default_weights: HashMap<String, f64>,
    /// Categories in match order
    #[serde(default)]
    pub categories: Vec<CategoryPolicy>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mode: RoutingMode::default(),
            default_category: default_category(),
            anthropic_provider: default_anthropic_provider(),
            sensitive_tasks: Vec::new(),
            default_weights: default_weights(),
            categories: Vec::new(),
        }
    }
}

impl RoutingConfig {
    /// Look up a declared category by name
    pub fn category(&self, name: &str) -> Option<&CategoryPolicy> {
        self.categories.iter().find(|c| c.name == name)
    }
}

fn default_category() -> String {
    "analysis".to_string()
}

fn default_anthropic_provider() -> String {
    "claude".to_string()
}

fn default_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("llama".to_string(), 0.4),
        ("mistral".to_string(), 0.3),
        ("openai".to_string(), 0.2),
        ("claude".to_string(), 0.1),
    ])
}

/// One task category: keywords in match order plus per-provider base weights
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryPolicy {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

/// Individual provider configuration
///
/// Fields are private; instances only come from deserialization and are
/// validated by `Config::validate()`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    id: String,
    /// Adapter type, resolved per call so one bad entry can't stop startup
    #[serde(rename = "type")]
    kind: String,
    base_url: String,
    model: String,
    /// Name of the environment variable holding the credential
    #[serde(default)]
    api_key_env: Option<String>,
}

impl ProviderConfig {
    /// Get the provider identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the declared adapter type
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Get the provider base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model name sent to the provider
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the credential environment variable name, if any
    pub fn api_key_env(&self) -> Option<&str> {
        self.api_key_env.as_deref()
    }

    /// Resolve the credential from the environment
    ///
    /// Missing or unset variables mean the call goes out without a credential.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Failure tracking and cooldown settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
    #[serde(default = "default_latency_window")]
    pub latency_window: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_seconds: default_cooldown_seconds(),
            latency_window: default_latency_window(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_seconds() -> u64 {
    300
}

fn default_latency_window() -> usize {
    100
}

/// Deduplication cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    /// Number of prompt characters that participate in the fingerprint
    #[serde(default = "default_prompt_prefix_chars")]
    pub prompt_prefix_chars: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
            prompt_prefix_chars: default_prompt_prefix_chars(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_prompt_prefix_chars() -> usize {
    500
}

/// Insight distributor settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistributorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub broadcast_url: Option<String>,
    #[serde(default = "default_distributor_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broadcast_url: None,
            timeout_seconds: default_distributor_timeout(),
            topic: default_topic(),
        }
    }
}

fn default_distributor_timeout() -> u64 {
    3
}

fn default_topic() -> String {
    "ai_bridge.insight".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Look up a provider by id
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; tests that build a Config by
    /// other means should call it explicitly.
    pub fn validate(&self) -> AppResult<()> {
        if self.providers.is_empty() {
            return Err(AppError::Config(
                "at least one [[providers]] entry is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(AppError::Config("provider id cannot be empty".to_string()));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(AppError::Config(format!(
                    "provider '{}' is declared more than once",
                    provider.id
                )));
            }
            if !provider.base_url.starts_with("http://")
                && !provider.base_url.starts_with("https://")
            {
                return Err(AppError::Config(format!(
                    "provider '{}' has invalid base_url '{}'; it must start with 'http://' or 'https://'",
                    provider.id, provider.base_url
                )));
            }
            if crate::models::AdapterKind::parse(&provider.kind).is_none() {
                tracing::warn!(
                    provider = %provider.id,
                    kind = %provider.kind,
                    "Unsupported provider type; calls to this provider will fail"
                );
            }
        }

        for category in &self.routing.categories {
            if category.name.trim().is_empty() {
                return Err(AppError::Config("category name cannot be empty".to_string()));
            }
            for (provider, weight) in &category.weights {
                if !seen.contains(provider.as_str()) {
                    return Err(AppError::Config(format!(
                        "category '{}' weights undeclared provider '{}'",
                        category.name, provider
                    )));
                }
                if !weight.is_finite() || *weight < 0.0 {
                    return Err(AppError::Config(format!(
                        "category '{}' has invalid weight {} for provider '{}'; \
                        weights must be finite and non-negative",
                        category.name, weight, provider
                    )));
                }
            }
        }

        for (provider, weight) in &self.routing.default_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(AppError::Config(format!(
                    "default weight {} for provider '{}' must be finite and non-negative",
                    weight, provider
                )));
            }
        }

        if self.routing.default_category.trim().is_empty() {
            return Err(AppError::Config(
                "routing.default_category cannot be empty".to_string(),
            ));
        }

        if self.provider(&self.routing.anthropic_provider).is_none() {
            return Err(AppError::Config(format!(
                "routing.anthropic_provider '{}' is not a declared provider",
                self.routing.anthropic_provider
            )));
        }

        for (name, seconds) in [
            ("server.request_timeout_seconds", self.server.request_timeout_seconds),
            ("distributor.timeout_seconds", self.distributor.timeout_seconds),
        ] {
            if seconds == 0 || seconds > 300 {
                return Err(AppError::Config(format!(
                    "{} must be in (0, 300], got {}",
                    name, seconds
                )));
            }
        }

        if self.tracking.failure_threshold == 0 {
            return Err(AppError::Config(
                "tracking.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.tracking.latency_window == 0 {
            return Err(AppError::Config(
                "tracking.latency_window must be at least 1".to_string(),
            ));
        }

        if self.distributor.enabled && self.distributor.broadcast_url.is_none() {
            return Err(AppError::Config(
                "distributor.broadcast_url is required when the distributor is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEST_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 7010

[routing]
mode = "hybrid"
sensitive_tasks = ["legal"]

[[routing.categories]]
name = "coding"
keywords = ["code", "function"]
weights = { openai = 0.6, claude = 0.4 }

[[routing.categories]]
name = "conversation"
keywords = ["hello"]

[[providers]]
id = "openai"
type = "openai"
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"

[[providers]]
id = "claude"
type = "anthropic"
base_url = "https://api.anthropic.com/v1"
model = "claude-3-5-sonnet"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.port, 7010);
        assert_eq!(config.server.request_timeout_seconds, 60);
        assert_eq!(config.routing.mode, RoutingMode::Hybrid);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[1].kind(), "anthropic");
        assert_eq!(config.providers[0].api_key_env(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_categories_keep_declared_order() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        let names: Vec<_> = config
            .routing
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["coding", "conversation"]);
        assert_eq!(config.routing.category("coding").unwrap().weights["openai"], 0.6);
        assert!(config.routing.category("planning").is_none());
    }

    #[test]
    fn test_defaults_are_applied() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        assert_eq!(config.routing.default_category, "analysis");
        assert_eq!(config.routing.anthropic_provider, "claude");
        assert_eq!(config.routing.default_weights["llama"], 0.4);
        assert_eq!(config.tracking.failure_threshold, 3);
        assert_eq!(config.tracking.cooldown_seconds, 300);
        assert_eq!(config.tracking.latency_window, 100);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.cache.prompt_prefix_chars, 500);
        assert!(!config.distributor.enabled);
        assert_eq!(config.distributor.topic, "ai_bridge.insight");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_missing_api_key_env_yields_no_credential() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        assert_eq!(config.provider("claude").unwrap().api_key(), None);
    }

    #[test]
    fn test_weights_for_undeclared_provider_rejected() {
        let bad = TEST_CONFIG.replace("claude = 0.4", "grok = 0.4");
        let err = Config::from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("grok"), "got: {}", err);
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let bad = TEST_CONFIG.replace("id = \"claude\"", "id = \"openai\"");
        let err = Config::from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let bad = TEST_CONFIG.replace("https://api.openai.com/v1", "api.openai.com/v1");
        assert!(Config::from_str(&bad).is_err());
    }

    #[test]
    fn test_unknown_anthropic_provider_rejected() {
        let bad = TEST_CONFIG.replace("mode = \"hybrid\"", "anthropic_provider = \"bedrock\"");
        let err = Config::from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("bedrock"));
    }

    #[test]
    fn test_unknown_provider_type_is_accepted_at_load() {
        let config = TEST_CONFIG.replace("type = \"openai\"", "type = \"xai\"");
        let config = Config::from_str(&config).expect("unknown type is a per-call failure");
        assert_eq!(config.provider("openai").unwrap().kind(), "xai");
    }

    #[test]
    fn test_invalid_mode_fails_to_parse() {
        let bad = TEST_CONFIG.replace("mode = \"hybrid\"", "mode = \"quorum\"");
        assert!(Config::from_str(&bad).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let bad = TEST_CONFIG.replace("port = 7010", "port = 7010\nrequest_timeout_seconds = 0");
        assert!(Config::from_str(&bad).is_err());
    }

    #[test]
    fn test_enabled_distributor_requires_url() {
        let bad = format!("{}\n[distributor]\nenabled = true\n", TEST_CONFIG);
        let err = Config::from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("broadcast_url"));
    }

    #[test]
    fn test_empty_provider_list_rejected() {
        let bad = r#"
providers = []

[server]
host = "127.0.0.1"
port = 7010
"#;
        assert!(Config::from_str(bad).is_err());
    }

    #[test]
    fn test_from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).expect("should load from file");
        assert_eq!(config.providers.len(), 2);
    }

    #[test]
    fn test_from_file_missing_file_reports_path() {
        let err = Config::from_file("/nonexistent/bridge.toml").unwrap_err();
        assert!(matches!(err, AppError::ConfigFileRead { .. }));
        assert!(err.to_string().contains("/nonexistent/bridge.toml"));
    }

    #[test]
    fn test_from_file_validation_failure_reports_reason() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG.replace("claude = 0.4", "grok = 0.4").as_bytes())
            .unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AppError::ConfigValidationFailed { .. }));
    }
}
