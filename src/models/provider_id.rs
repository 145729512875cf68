//! Type-safe provider identifier
//!
//! Used for performance records, cooldown entries and exclusion sets so a
//! raw string never stands in for a provider.

use crate::config::{Config, ProviderConfig};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Opaque identifier for a backend provider
///
/// # Validation
/// - `new()`: validates against the configuration, returns `Result`
/// - `From<&ProviderConfig>`: always valid (comes from config)
/// - `From<String>` / `From<&str>`: no validation; meant for tests and lookups
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a validated ProviderId
    ///
    /// # Errors
    /// Returns an error listing the declared providers if `id` is unknown.
    pub fn new(id: String, config: &Config) -> Result<Self, String> {
        if config.provider(&id).is_some() {
            Ok(Self(id))
        } else {
            let available: Vec<&str> = config.providers.iter().map(|p| p.id()).collect();
            Err(format!(
                "Unknown provider: '{}'. Available providers: {}",
                id,
                available.join(", ")
            ))
        }
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ProviderConfig> for ProviderId {
    fn from(provider: &ProviderConfig) -> Self {
        Self(provider.id().to_string())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Providers to leave out of a committee retry
pub type ExclusionSet = HashSet<ProviderId>;
