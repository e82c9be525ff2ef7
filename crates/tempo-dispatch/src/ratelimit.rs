//! Lazy token-bucket rate limiting.
//!
//! Buckets are keyed by (command, user, scope) and created lazily at full
//! burst on first access. Availability is computed from wall-clock reads at
//! access time — `min(burst, tokens_at_last_take + elapsed / restoration)`
//! — so correctness needs no scheduler tick and holds under bursty,
//! irregular call patterns. A denied take reports how long until the next
//! token exists.
//!
//! # Locking
//!
//! The key map is a `RwLock<HashMap<_, Arc<Mutex<Bucket>>>>`: lookups take
//! the read lock briefly and then serialize on the per-bucket mutex, so
//! concurrent takes on the same key never lose a decrement and takes on
//! different keys never contend with each other. The map's write lock is
//! only taken to insert a missing bucket, and idle buckets are reclaimed
//! opportunistically at that point — memory hygiene, not a correctness
//! requirement, so no background sweeper exists.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::trace;

use crate::command::RatePolicy;

/// Composite identity of one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    /// Name of the resolved command.
    pub command: String,
    /// Invoking user.
    pub user: String,
    /// Invoking scope; empty for globally-scoped policies.
    pub scope: String,
}

impl BucketKey {
    /// Key for a per-scope bucket.
    pub fn new(
        command: impl Into<String>,
        user: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            user: user.into(),
            scope: scope.into(),
        }
    }

    /// Key for a globally-scoped bucket (scope left empty).
    pub fn global(command: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(command, user, "")
    }
}

/// Result of a take attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Take {
    /// Whether a token was consumed.
    pub allowed: bool,
    /// When denied, time until the next token regenerates. Zero when
    /// allowed.
    pub retry_after: Duration,
}

#[derive(Debug)]
struct Bucket {
    burst: u32,
    restoration: Duration,
    /// Tokens held as of `last_take`.
    tokens: u32,
    /// Timestamp of the last successful take.
    last_take: Instant,
    /// Timestamp of the last access of any kind, for idle reclamation.
    last_access: Instant,
}

impl Bucket {
    fn new(policy: &RatePolicy, now: Instant) -> Self {
        Self {
            burst: policy.burst,
            restoration: policy.restoration,
            tokens: policy.burst,
            last_take: now,
            last_access: now,
        }
    }

    fn take_at(&mut self, now: Instant) -> Take {
        self.last_access = now;
        let elapsed = now.saturating_duration_since(self.last_take);

        let available = if self.restoration.is_zero() {
            self.burst
        } else {
            let regenerated =
                u32::try_from(elapsed.as_nanos() / self.restoration.as_nanos()).unwrap_or(u32::MAX);
            self.tokens.saturating_add(regenerated).min(self.burst)
        };

        if available >= 1 {
            self.tokens = available - 1;
            self.last_take = now;
            Take {
                allowed: true,
                retry_after: Duration::ZERO,
            }
        } else {
            // available == 0 implies elapsed < restoration: a full interval
            // since the last take would have regenerated a token.
            Take {
                allowed: false,
                retry_after: self.restoration.saturating_sub(elapsed),
            }
        }
    }
}

/// Manager of lazily-created token buckets.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: RwLock<HashMap<BucketKey, Arc<Mutex<Bucket>>>>,
    idle_ttl: Duration,
}

impl RateLimiter {
    /// Creates a limiter that reclaims buckets idle for `idle_ttl`.
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Attempts to take one token for `key`, creating the bucket (seeded to
    /// full burst from `policy`) on first access.
    pub fn take(&self, key: &BucketKey, policy: &RatePolicy) -> Take {
        self.take_at(key, policy, Instant::now())
    }

    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    fn take_at(&self, key: &BucketKey, policy: &RatePolicy, now: Instant) -> Take {
        // Fast path: bucket exists, only the per-key mutex is contended.
        let existing = self.buckets.read().get(key).cloned();
        let bucket = match existing {
            Some(bucket) => bucket,
            None => {
                let mut map = self.buckets.write();
                self.reclaim_idle(&mut map, now);
                Arc::clone(
                    map.entry(key.clone())
                        .or_insert_with(|| Arc::new(Mutex::new(Bucket::new(policy, now)))),
                )
            }
        };

        let take = bucket.lock().take_at(now);
        trace!(?key, allowed = take.allowed, "bucket take");
        take
    }

    /// Drops buckets untouched for longer than the idle TTL. Runs under the
    /// map write lock; buckets currently locked by a taker are kept.
    fn reclaim_idle(&self, map: &mut HashMap<BucketKey, Arc<Mutex<Bucket>>>, now: Instant) {
        map.retain(|_, bucket| match bucket.try_lock() {
            Some(guard) => now.saturating_duration_since(guard.last_access) < self.idle_ttl,
            None => true,
        });
    }
}
