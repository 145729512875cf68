//! Response deduplication cache
//!
//! Successful responses are stored under a fingerprint of the task category
//! and the prompt prefix. Entries are never evicted proactively; expiry is
//! checked on lookup only.

use crate::config::CacheConfig;
use crate::router::TaskCategory;
use dashmap::DashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Stable hash of (category, prompt prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    inserted: Instant,
}

/// TTL-bounded response store
///
/// Backed by a sharded map so lookups and inserts for different keys do not
/// contend on a single lock.
#[derive(Debug)]
pub struct DeduplicationCache {
    entries: DashMap<Fingerprint, CacheEntry>,
    ttl: Duration,
    prefix_chars: usize,
}

impl DeduplicationCache {
    pub fn new(cache: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_secs(cache.ttl_seconds),
            prefix_chars: cache.prompt_prefix_chars,
        }
    }

    /// Fingerprint a prompt within its category
    ///
    /// Only the first `prompt_prefix_chars` characters of the prompt count,
    /// so long prompts sharing a prefix collide by construction.
    pub fn fingerprint(&self, prompt: &str, category: &TaskCategory) -> Fingerprint {
        let prefix: String = prompt.chars().take(self.prefix_chars).collect();
        let mut hasher = blake3::Hasher::new();
        hasher.update(category.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(prefix.as_bytes());
        Fingerprint(hasher.finalize())
    }

    /// Cached body if younger than the TTL
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<String> {
        let entry = self.entries.get(fingerprint)?;
        if entry.inserted.elapsed() < self.ttl {
            Some(entry.body.clone())
        } else {
            None
        }
    }

    /// Store a body, replacing any earlier entry
    pub fn put(&self, fingerprint: Fingerprint, body: impl Into<String>) {
        self.entries.insert(
            fingerprint,
            CacheEntry {
                body: body.into(),
                inserted: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
