// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local cache of authorization verdicts keyed by token fingerprint.
//!
//! Entries expire lazily: an entry is served only while `now < expires_at`
//! and is dropped when read after that. The map is a bounded LRU, so an
//! eviction under pressure only costs a re-verification.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use sha2::{Digest, Sha256};

use super::claims::AuthorizationContext;
use crate::clock::Clock;

/// Resource-independent outcome of validating one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow {
        context: AuthorizationContext,
        /// Token `exp`; caps how long the verdict may be cached.
        token_expires_at: DateTime<Utc>,
    },
    Deny,
}

/// A freshly computed verdict and whether it may be cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computed {
    pub verdict: Verdict,
    pub cacheable: bool,
}

impl Computed {
    pub fn cacheable(verdict: Verdict) -> Self {
        Self {
            verdict,
            cacheable: true,
        }
    }

    /// A verdict caused by an infrastructure failure rather than the token.
    pub fn transient(verdict: Verdict) -> Self {
        Self {
            verdict,
            cacheable: false,
        }
    }
}

struct CacheEntry {
    verdict: Verdict,
    expires_at: DateTime<Utc>,
}

/// Bounded TTL cache of verdicts.
pub struct DecisionCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl DecisionCache {
    /// Create a cache holding at most `capacity` verdicts for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    /// Return the live cached verdict for `fingerprint`, or run `compute`
    /// and cache its verdict if it is cacheable.
    ///
    /// The lock is not held while `compute` runs; concurrent misses for the
    /// same fingerprint both compute and the later write wins.
    pub async fn get_or_compute<F, Fut>(&self, fingerprint: &str, compute: F) -> Verdict
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Computed>,
    {
        if let Some(verdict) = self.lookup(fingerprint) {
            tracing::debug!(fingerprint = short(fingerprint), "Decision cache hit");
            return verdict;
        }

        let computed = compute().await;
        if computed.cacheable {
            self.store(fingerprint, computed.verdict.clone());
        }
        computed.verdict
    }

    /// Number of entries currently held, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, fingerprint: &str) -> Option<Verdict> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(fingerprint) {
            Some(entry) if now < entry.expires_at => return Some(entry.verdict.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(fingerprint);
        }
        None
    }

    fn store(&self, fingerprint: &str, verdict: Verdict) {
        let mut expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if let Verdict::Allow {
            token_expires_at, ..
        } = &verdict
        {
            expires_at = expires_at.min(*token_expires_at);
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                fingerprint.to_string(),
                CacheEntry {
                    verdict,
                    expires_at,
                },
            );
        }
    }
}

/// Lowercase hex SHA-256 of the raw token string.
pub fn fingerprint(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Fingerprint prefix safe to put in logs.
pub(crate) fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
