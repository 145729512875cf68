//! Routing logic for the provider bridge
//!
//! Classifies each request, picks a provider (or a committee of providers)
//! and reduces the outcome to a single response.

pub mod adaptive;
pub mod classifier;
pub mod committee;
pub mod dispatch;

pub use adaptive::{AdaptiveRouter, ResponseSource, RoutedResponse};
pub use classifier::TaskClassifier;
pub use committee::{CommitteeAggregator, CommitteeAttempt, CommitteeVerdict};
pub use dispatch::ProviderDispatcher;

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Routing mode for chat-completion requests
///
/// `Adaptive` and `Hybrid` behave identically; both names are accepted
/// because deployments use either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    #[default]
    Adaptive,
    Hybrid,
    Committee,
}

impl RoutingMode {
    /// Convert to string representation for logging and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adaptive => "adaptive",
            Self::Hybrid => "hybrid",
            Self::Committee => "committee",
        }
    }
}

impl FromStr for RoutingMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adaptive" => Ok(Self::Adaptive),
            "hybrid" => Ok(Self::Hybrid),
            "committee" => Ok(Self::Committee),
            _ => Err(AppError::InvalidMode(s.to_string())),
        }
    }
}

/// Coarse task label that drives provider weighting
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskCategory(String);

impl TaskCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
