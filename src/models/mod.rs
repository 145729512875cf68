//! Provider model: identity, adapters, performance and selection
//!
//! Wraps provider calls behind the `ProviderAdapter` trait and picks a
//! provider per request from live performance weights.

pub mod adapter;
pub mod performance;
pub mod provider_id;
pub mod request;
pub mod selector;
pub mod weights;

pub use adapter::{AdapterError, AdapterKind, HttpAdapter, ProviderAdapter, ProviderReply};
pub use performance::{PerformanceRecord, PerformanceTracker, ProviderStats};
pub use provider_id::{ExclusionSet, ProviderId};
pub use request::{ChatMessage, CompletionRequest};
pub use selector::ProviderSelector;
pub use weights::{WeightEngine, WeightVector};
