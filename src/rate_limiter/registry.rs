//! # Client Registry
//!
//! Maps each client identity to its token bucket and the last time it was
//! seen. The registry owns the locking discipline for the whole limiter.
//!
//! ```text
//!     Client Requests:
//!     "10.0.0.1" ──┐
//!     "10.0.0.2" ──┼──► ClientRegistry ──► ClientEntry { bucket, last_seen }
//!     "10.0.0.3" ──┘         │
//!                      ┌─────▼──────────────┐
//!                      │  DashMap (sharded) │
//!                      │  shard 0: RwLock ──┼── "10.0.0.1" → entry
//!                      │  shard 1: RwLock ──┼── "10.0.0.3" → entry
//!                      │  ...               │
//!                      └────────────────────┘
//! ```
//!
//! ## Locking Discipline
//!
//! Every read and write of an entry happens under the write lock of the
//! shard holding it. [`ClientRegistry::get_or_create`] returns a guard that
//! keeps that lock until it is dropped, so the caller can update
//! `last_seen` and spend a token as one atomic step with respect to other
//! requests for the same identity. The guard must be dropped before any
//! slow work is done.
//!
//! Requests for identities in different shards never wait on each other.
//! Requests for identities that share a shard wait only for an O(1)
//! critical section.
//!
//! [`ClientRegistry::sweep`] is the only way entries are removed. It walks
//! every shard, taking each shard's lock in turn.

use super::bucket::TokenBucket;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::ops::DerefMut;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Expected number of concurrently tracked clients, used to pre-size shards.
const EXPECTED_CLIENTS: usize = 4_096;

/// Upper bound on the shard count.
const MAX_SHARDS: usize = 64;

/// Rate state tracked for one client identity.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    /// The client's token bucket.
    pub bucket: TokenBucket,
    last_seen: Instant,
}

impl ClientEntry {
    fn new(capacity: u64, refill_rate_per_second: f64, now: Instant) -> Self {
        Self {
            bucket: TokenBucket::new(capacity, refill_rate_per_second, now),
            last_seen: now,
        }
    }

    /// Last time an admission check was made for this client.
    #[inline]
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Whether the client has been silent for strictly longer than `threshold`.
    #[inline]
    pub fn is_idle(&self, threshold: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > threshold
    }
}

/// Concurrent map from client identity to [`ClientEntry`].
///
/// # Example
///
/// ```rust
/// use turnstile::ClientRegistry;
/// use std::time::{Duration, Instant};
///
/// let registry = ClientRegistry::new();
/// let now = Instant::now();
///
/// // Lock held only for the duration of this statement
/// let allowed = registry.get_or_create("10.0.0.1", 2, 1.0, now).bucket.consume(now);
/// assert!(allowed);
/// assert_eq!(registry.len(), 1);
///
/// // Five minutes later the client is idle and gets swept
/// let later = now + Duration::from_secs(300);
/// assert_eq!(registry.sweep(Duration::from_secs(180), later), 1);
/// assert!(registry.is_empty());
/// ```
pub struct ClientRegistry {
    clients: DashMap<String, ClientEntry, ahash::RandomState>,

    /// Fast size counter so stats do not need to lock every shard.
    active_count: AtomicUsize,

    total_created: AtomicU64,
    total_evicted: AtomicU64,
}

impl ClientRegistry {
    /// Creates an empty registry.
    ///
    /// The shard count follows the available parallelism so that request
    /// threads rarely land on the same shard.
    pub fn new() -> Self {
        let num_shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .saturating_mul(4)
            .next_power_of_two()
            .clamp(2, MAX_SHARDS);

        let initial_capacity = (EXPECTED_CLIENTS / num_shards).max(64);

        Self {
            clients: DashMap::with_capacity_and_hasher_and_shard_amount(
                initial_capacity,
                ahash::RandomState::new(),
                num_shards,
            ),
            active_count: AtomicUsize::new(0),
            total_created: AtomicU64::new(0),
            total_evicted: AtomicU64::new(0),
        }
    }

    /// Looks up `identity`, creating a full bucket on first sighting, and
    /// stamps `last_seen = now`.
    ///
    /// The returned guard holds the lock protecting this entry. Spend the
    /// token through it and drop it right away:
    ///
    /// ```rust
    /// # use turnstile::ClientRegistry;
    /// # use std::time::Instant;
    /// # let registry = ClientRegistry::new();
    /// # let now = Instant::now();
    /// let allowed = {
    ///     let mut entry = registry.get_or_create("client-a", 10, 5.0, now);
    ///     entry.bucket.consume(now)
    /// }; // lock released here
    /// # assert!(allowed);
    /// ```
    ///
    /// `capacity` and `refill_rate_per_second` are only used when a new
    /// bucket is created.
    #[inline]
    pub fn get_or_create(
        &self,
        identity: &str,
        capacity: u64,
        refill_rate_per_second: f64,
        now: Instant,
    ) -> impl DerefMut<Target = ClientEntry> + '_ {
        // Fast path: known client, no allocation
        if let Some(mut entry) = self.clients.get_mut(identity) {
            entry.last_seen = now;
            return entry;
        }

        let mut entry = match self.clients.entry(identity.to_owned()) {
            // Another thread created it between the two lookups
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => {
                let entry = vacant.insert(ClientEntry::new(capacity, refill_rate_per_second, now));
                let active = self.active_count.fetch_add(1, Ordering::AcqRel) + 1;
                self.total_created.fetch_add(1, Ordering::Relaxed);
                debug!("Tracking new client {} (active: {})", identity, active);
                entry
            }
        };

        entry.last_seen = now;
        entry
    }

    /// Removes every client idle for longer than `idle_threshold` at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, idle_threshold: Duration, now: Instant) -> usize {
        let mut removed = 0usize;

        self.clients.retain(|identity, entry| {
            if entry.is_idle(idle_threshold, now) {
                debug!("Evicting idle client {}", identity);
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.active_count.fetch_sub(removed, Ordering::AcqRel);
            self.total_evicted.fetch_add(removed as u64, Ordering::Relaxed);
            self.shrink_if_oversized();
        }

        removed
    }

    /// Releases map memory after large evictions.
    fn shrink_if_oversized(&self) {
        let current = self.active_count.load(Ordering::Acquire);
        let capacity = self.clients.capacity();

        if capacity > current.saturating_mul(4) && capacity > EXPECTED_CLIENTS {
            self.clients.shrink_to_fit();
            debug!("Shrunk client map capacity from {} to ~{}", capacity, current);
        }
    }

    /// Number of tracked clients.
    #[inline]
    pub fn len(&self) -> usize {
        self.active_count.load(Ordering::Acquire)
    }

    /// Whether no client is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `identity` currently has an entry.
    pub fn contains(&self, identity: &str) -> bool {
        self.clients.contains_key(identity)
    }

    /// Tokens `identity` would hold at `now`, without touching `last_seen`.
    ///
    /// Returns `None` for unknown clients.
    pub fn tokens(&self, identity: &str, now: Instant) -> Option<f64> {
        self.clients
            .get(identity)
            .map(|entry| entry.bucket.tokens_at(now))
    }

    /// Last time `identity` was seen, if tracked.
    pub fn last_seen(&self, identity: &str) -> Option<Instant> {
        self.clients.get(identity).map(|entry| entry.last_seen)
    }

    /// Snapshot of registry counters.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            active_clients: self.len(),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_evicted: self.total_evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("active_clients", &self.len())
            .field("total_created", &self.total_created.load(Ordering::Relaxed))
            .finish()
    }
}

/// Lifetime counters for a [`ClientRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Clients currently tracked.
    pub active_clients: usize,

    /// Entries created since startup.
    pub total_created: u64,

    /// Entries removed by sweeps since startup.
    pub total_evicted: u64,
}

impl RegistryStats {
    /// Fraction of created entries that have since been evicted.
    ///
    /// Close to 1.0 under steady churn; a low value with a large
    /// `active_clients` suggests the idle threshold is too generous.
    pub fn eviction_ratio(&self) -> f64 {
        if self.total_created == 0 {
            0.0
        } else {
            self.total_evicted as f64 / self.total_created as f64
        }
    }
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clients: {} active, {} created, {} evicted",
            self.active_clients, self.total_created, self.total_evicted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_get_or_create_inserts_full_bucket() {
        let registry = ClientRegistry::new();
        let now = Instant::now();

        {
            let entry = registry.get_or_create("a", 5, 1.0, now);
            assert_eq!(entry.bucket.tokens(), 5.0);
            assert_eq!(entry.last_seen(), now);
        }

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("a"));
        assert!(!registry.contains("b"));
    }

    #[test]
    fn test_existing_entry_is_reused_and_stamped() {
        let registry = ClientRegistry::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);

        assert!(registry.get_or_create("a", 2, 0.001, t0).bucket.consume(t0));
        {
            let entry = registry.get_or_create("a", 2, 0.001, t1);
            assert!(entry.bucket.tokens() < 2.0);
            assert_eq!(entry.last_seen(), t1);
        }

        let stats = registry.stats();
        assert_eq!(stats.active_clients, 1);
        assert_eq!(stats.total_created, 1);
    }

    #[test]
    fn test_last_seen_updated_on_rejection() {
        let registry = ClientRegistry::new();
        let t0 = Instant::now();

        assert!(registry.get_or_create("a", 1, 0.001, t0).bucket.consume(t0));

        let t1 = t0 + Duration::from_millis(10);
        assert!(!registry.get_or_create("a", 1, 0.001, t1).bucket.consume(t1));
        assert_eq!(registry.last_seen("a"), Some(t1));
    }

    #[test]
    fn test_sweep_removes_only_idle() {
        let registry = ClientRegistry::new();
        let t0 = Instant::now();
        let threshold = Duration::from_secs(180);

        drop(registry.get_or_create("stale", 4, 2.0, t0));
        drop(registry.get_or_create("fresh", 4, 2.0, t0 + Duration::from_secs(120)));

        let now = t0 + Duration::from_secs(200);
        assert_eq!(registry.sweep(threshold, now), 1);
        assert!(!registry.contains("stale"));
        assert!(registry.contains("fresh"));

        let stats = registry.stats();
        assert_eq!(stats.active_clients, 1);
        assert_eq!(stats.total_evicted, 1);
    }

    #[test]
    fn test_sweep_threshold_is_strict() {
        let registry = ClientRegistry::new();
        let t0 = Instant::now();
        let threshold = Duration::from_secs(60);

        drop(registry.get_or_create("a", 1, 1.0, t0));

        assert_eq!(registry.sweep(threshold, t0 + threshold), 0);
        assert_eq!(
            registry.sweep(threshold, t0 + threshold + Duration::from_millis(1)),
            1
        );
    }

    #[test]
    fn test_eviction_resets_bucket() {
        let registry = ClientRegistry::new();
        let t0 = Instant::now();

        assert!(registry.get_or_create("a", 1, 0.001, t0).bucket.consume(t0));
        assert!(!registry.get_or_create("a", 1, 0.001, t0).bucket.consume(t0));

        let later = t0 + Duration::from_secs(10);
        assert_eq!(registry.sweep(Duration::from_secs(5), later), 1);

        assert!(registry.get_or_create("a", 1, 0.001, later).bucket.consume(later));
        assert_eq!(registry.stats().total_created, 2);
    }

    #[test]
    fn test_tokens_peek_does_not_touch_last_seen() {
        let registry = ClientRegistry::new();
        let t0 = Instant::now();
        drop(registry.get_or_create("a", 3, 1.0, t0));

        let t1 = t0 + Duration::from_secs(1);
        assert_eq!(registry.tokens("a", t1), Some(3.0));
        assert_eq!(registry.last_seen("a"), Some(t0));
        assert_eq!(registry.tokens("missing", t1), None);
    }

    #[test]
    fn test_eviction_ratio_counts_sweeps() {
        let registry = ClientRegistry::new();
        let t0 = Instant::now();
        for i in 0..10 {
            drop(registry.get_or_create(&format!("10.0.0.{}", i), 1, 1.0, t0));
        }

        // Half the clients come back before the sweep
        let t1 = t0 + Duration::from_secs(100);
        for i in 0..5 {
            drop(registry.get_or_create(&format!("10.0.0.{}", i), 1, 1.0, t1));
        }

        let t2 = t0 + Duration::from_secs(200);
        assert_eq!(registry.sweep(Duration::from_secs(150), t2), 5);

        let stats = registry.stats();
        assert_eq!(stats.active_clients, 5);
        assert_eq!(stats.total_evicted, 5);
        assert_eq!(stats.eviction_ratio(), 0.5);
    }

    #[test]
    fn test_concurrent_creation_single_entry() {
        let registry = Arc::new(ClientRegistry::new());
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        drop(registry.get_or_create("shared", 1000, 1.0, now));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = registry.stats();
        assert_eq!(stats.active_clients, 1);
        assert_eq!(stats.total_created, 1);
    }

    #[test]
    fn test_concurrent_sweep_and_access() {
        let registry = Arc::new(ClientRegistry::new());
        let t0 = Instant::now();

        for i in 0..500 {
            drop(registry.get_or_create(&format!("old-{}", i), 1, 1.0, t0));
        }

        let later = t0 + Duration::from_secs(10);
        let writer = {
            let registry = registry.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    drop(registry.get_or_create(&format!("new-{}", i), 1, 1.0, later));
                }
            })
        };
        let sweeper = {
            let registry = registry.clone();
            thread::spawn(move || registry.sweep(Duration::from_secs(5), later))
        };

        writer.join().unwrap();
        let removed = sweeper.join().unwrap();

        assert_eq!(removed, 500);
        assert_eq!(registry.len(), 500);
        assert!(registry.contains("new-0"));
    }

    #[test]
    fn test_stats_display() {
        let stats = RegistryStats {
            active_clients: 3,
            total_created: 10,
            total_evicted: 7,
        };
        assert_eq!(
            stats.to_string(),
            "clients: 3 active, 10 created, 7 evicted"
        );
        assert!((stats.eviction_ratio() - 0.7).abs() < f64::EPSILON);
    }
}
