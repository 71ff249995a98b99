//! # Admission Gate
//!
//! The single entry point the request-handling layer calls, once per
//! inbound request.
//!
//! ```text
//!     check(identity, enabled, now):
//!
//!     enabled? ──No──► Allow (registry untouched)
//!        │
//!       Yes
//!        ▼
//!     lock entry ──► stamp last_seen ──► consume ──► unlock
//!                                           │
//!                               token? ─────┴───── no token?
//!                                 ▼                    ▼
//!                               Allow               Reject
//! ```
//!
//! The decision is captured and the lock released before the caller builds
//! any response, so downstream work never runs inside the critical section.
//! Identity resolution (which address, whether to trust proxy headers) is
//! the caller's concern; the gate sees an opaque string.

use super::clock::{Clock, SystemClock};
use super::config::LimiterConfig;
use super::error::{ConfigError, ReaperError};
use super::metrics::GateMetrics;
use super::reaper::Reaper;
use super::registry::ClientRegistry;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, trace};

/// Outcome of an admission check.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Let the request through.
    Allow,
    /// Turn the request away; the caller reports a rate-limit failure.
    Reject,
}

impl Decision {
    /// Whether the request was admitted.
    #[inline]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Whether the request was turned away.
    #[inline]
    pub fn is_rejected(self) -> bool {
        matches!(self, Self::Reject)
    }
}

impl From<bool> for Decision {
    #[inline]
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Reject
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Per-client token-bucket admission control.
///
/// Construct one per process (or per protected resource), wrap it in an
/// `Arc`, and hand it to the request handlers.
///
/// # Example
///
/// ```rust
/// use turnstile::{AdmissionGate, Decision, LimiterConfig};
///
/// let gate = AdmissionGate::new(LimiterConfig::new(4, 2.0)).unwrap();
///
/// for _ in 0..4 {
///     assert_eq!(gate.admit("203.0.113.7"), Decision::Allow);
/// }
/// assert_eq!(gate.admit("203.0.113.7"), Decision::Reject);
///
/// // Other clients are unaffected
/// assert_eq!(gate.admit("198.51.100.2"), Decision::Allow);
/// ```
pub struct AdmissionGate {
    registry: Arc<ClientRegistry>,
    clock: Arc<dyn Clock>,
    config: LimiterConfig,

    /// Runtime on/off switch, read on every `admit`.
    enabled: AtomicBool,

    total_allowed: AtomicU64,
    total_rejected: AtomicU64,
    total_bypassed: AtomicU64,
}

impl AdmissionGate {
    /// Creates a gate reading the system monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`LimiterConfig::validate`].
    pub fn new(config: LimiterConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a gate with an injected clock.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found by [`LimiterConfig::validate`].
    pub fn with_clock(config: LimiterConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            "Admission gate ready (capacity: {}, refill: {}/s, idle threshold: {:?}, enabled: {})",
            config.capacity, config.refill_rate_per_second, config.idle_threshold, config.enabled
        );

        Ok(Self {
            registry: Arc::new(ClientRegistry::new()),
            clock,
            enabled: AtomicBool::new(config.enabled),
            config,
            total_allowed: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
            total_bypassed: AtomicU64::new(0),
        })
    }

    /// Decides whether a request from `identity` may proceed at `now`.
    ///
    /// With `enabled == false` the answer is always `Allow` and the registry
    /// is not touched. Otherwise one token is spent from the client's
    /// bucket, creating the bucket on first sighting.
    #[inline]
    pub fn check(&self, identity: &str, enabled: bool, now: Instant) -> Decision {
        if !enabled {
            self.total_bypassed.fetch_add(1, Ordering::Relaxed);
            return Decision::Allow;
        }

        let allowed = self
            .registry
            .get_or_create(
                identity,
                self.config.capacity,
                self.config.refill_rate_per_second,
                now,
            )
            .bucket
            .consume(now);

        if allowed {
            self.total_allowed.fetch_add(1, Ordering::Relaxed);
            Decision::Allow
        } else {
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
            trace!("Rejected request from {}", identity);
            Decision::Reject
        }
    }

    /// [`check`](Self::check) using the gate's own switch and clock.
    #[inline]
    pub fn admit(&self, identity: &str) -> Decision {
        self.check(identity, self.is_enabled(), self.clock.now())
    }

    /// Turns limiting on or off without rebuilding the gate.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!("Rate limiting {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    /// Current state of the on/off switch.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Starts the background reaper for this gate's registry.
    ///
    /// Uses the configured sweep interval and idle threshold and the gate's
    /// clock. The reaper stops when the returned handle is stopped or
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ReaperError::Spawn`] if the thread cannot be created.
    pub fn spawn_reaper(&self) -> Result<Reaper, ReaperError> {
        Reaper::spawn(
            self.registry.clone(),
            self.clock.clone(),
            self.config.sweep_interval,
            self.config.idle_threshold,
        )
    }

    /// Runs one sweep immediately with the configured idle threshold.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep_now(&self) -> usize {
        self.registry
            .sweep(self.config.idle_threshold, self.clock.now())
    }

    /// The validated configuration.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// The underlying client registry.
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// The gate's time source.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Snapshot of admission and registry counters.
    pub fn metrics(&self) -> GateMetrics {
        let registry = self.registry.stats();
        GateMetrics {
            total_allowed: self.total_allowed.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            total_bypassed: self.total_bypassed.load(Ordering::Relaxed),
            active_clients: registry.active_clients,
            total_created: registry.total_created,
            total_evicted: registry.total_evicted,
        }
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("capacity", &self.config.capacity)
            .field("refill_rate_per_second", &self.config.refill_rate_per_second)
            .field("enabled", &self.is_enabled())
            .field("active_clients", &self.registry.len())
            .finish()
    }
}
