//! # Turnstile - Per-Client Admission Control
//!
//! A request-admission layer that sits in front of your business logic and
//! decides, per client, whether a request may proceed. Each client identity
//! (typically a normalized source address) gets its own token bucket; idle
//! clients are forgotten by a background reaper so memory stays bounded.
//!
//! ## The Token Bucket Algorithm
//!
//! ```text
//!     Token Bucket Visualization (capacity 4, 2 tokens/sec):
//!
//!     Time 0.0s:  [🪙🪙🪙🪙] (4 tokens available)
//!     Request 1:  [🪙🪙🪙]   ✅ (takes 1 token)
//!     ...
//!     Request 5:  [        ] ❌ (nothing left, nothing taken)
//!     Time 0.5s:  [🪙]       (1 token earned back)
//!     Request 6:  [        ] ✅
//! ```
//!
//! - **Tokens** = Permission to make a request
//! - **Capacity** = Largest burst a client can send at once
//! - **Refill** = Continuous, computed lazily on each check
//!
//! ## Quick Start
//!
//! ```rust
//! use turnstile::{AdmissionGate, Decision, LimiterConfig};
//!
//! // Burst of 4, 2 requests per second sustained
//! let gate = AdmissionGate::new(LimiterConfig::new(4, 2.0)).unwrap();
//!
//! // In your request handler, with an identity you resolved yourself:
//! match gate.admit("192.0.2.10") {
//!     Decision::Allow => { /* process the request */ }
//!     Decision::Reject => { /* respond with 429 Too Many Requests */ }
//! }
//! ```
//!
//! ### With the Background Reaper
//!
//! ```rust
//! use turnstile::AdmissionGateBuilder;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let gate = Arc::new(
//!     AdmissionGateBuilder::new()
//!         .capacity(20)
//!         .refill_rate(10.0)
//!         .sweep_interval(Duration::from_secs(60))
//!         .idle_threshold(Duration::from_secs(180))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let reaper = gate.spawn_reaper().unwrap();
//!
//! // ... serve traffic ...
//!
//! reaper.stop().unwrap();
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │  Request-handling layer │
//!                    └──────────┬──────────────┘
//!                               │ admit(identity) → Allow | Reject
//!                    ┌──────────▼──────────────┐
//!                    │     AdmissionGate       │
//!                    └──────────┬──────────────┘
//!                               │
//!                ┌──────────────┴───────────────┐
//!                │                               │
//!     ┌──────────▼──────────┐       ┌───────────▼──────────┐
//!     │   ClientRegistry    │ ◄──── │       Reaper         │
//!     ├─────────────────────┤ sweep ├──────────────────────┤
//!     │ • identity → entry  │       │ • periodic thread    │
//!     │ • per-entry locking │       │ • idle eviction      │
//!     │ • TokenBucket each  │       │ • cooperative stop   │
//!     └─────────────────────┘       └──────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! `AdmissionGate` is `Send + Sync`; share it through [`SharedGate`]
//! (`Arc<AdmissionGate>`). Checks for the same client are serialized, so
//! no token is ever handed out twice; checks for different clients do not
//! wait on each other beyond a constant-time critical section.
//!
//! ## What This Crate Does Not Do
//!
//! It does not parse requests, resolve client addresses, or format
//! responses. It does not coordinate limits across processes or persist
//! state across restarts.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

// Internal module
mod rate_limiter;

// Public re-exports
pub use rate_limiter::{
    AdmissionGate, ClientEntry, ClientRegistry, Clock, ConfigError, Decision, Error, GateMetrics,
    HealthStatus, LimiterConfig, ManualClock, Reaper, ReaperError, RegistryStats, Result,
    SystemClock, TokenBucket, DEFAULT_CAPACITY, DEFAULT_IDLE_THRESHOLD,
    DEFAULT_REFILL_RATE_PER_SECOND, DEFAULT_SWEEP_INTERVAL, MAX_CAPACITY, REAPER_THREAD_NAME,
};

use std::sync::Arc;
use std::time::Duration;

/// An admission gate wrapped in `Arc` for sharing across request handlers.
///
/// # Example
/// ```rust
/// use turnstile::{AdmissionGate, LimiterConfig, SharedGate};
/// use std::sync::Arc;
///
/// let gate: SharedGate = Arc::new(AdmissionGate::new(LimiterConfig::default()).unwrap());
///
/// let handler_gate = gate.clone();
/// std::thread::spawn(move || {
///     let _ = handler_gate.admit("192.0.2.1");
/// })
/// .join()
/// .unwrap();
/// ```
pub type SharedGate = Arc<AdmissionGate>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
///
/// ```rust
/// use turnstile::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for typical admission-control use.
    //!
    //! # Example
    //! ```rust
    //! use turnstile::prelude::*;
    //!
    //! let gate = AdmissionGateBuilder::new().capacity(10).build().unwrap();
    //! assert_eq!(gate.admit("client"), Decision::Allow);
    //! ```

    pub use crate::{
        AdmissionGate, AdmissionGateBuilder, Clock, Decision, GateMetrics, HealthStatus,
        LimiterConfig, ManualClock, Reaper, SharedGate,
    };
}

/// Builder for [`AdmissionGate`] with validated configuration.
///
/// # Example
///
/// ```rust
/// use turnstile::{AdmissionGateBuilder, ConfigError, ManualClock};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let gate = AdmissionGateBuilder::new()
///     .capacity(100)                             // Burst size
///     .refill_rate(25.0)                         // Tokens per second
///     .idle_threshold(Duration::from_secs(300))  // Forget clients after 5 idle minutes
///     .sweep_interval(Duration::from_secs(60))   // Look for them every minute
///     .clock(Arc::new(clock.clone()))
///     .build()
///     .unwrap();
///
/// assert_eq!(gate.config().capacity, 100);
///
/// let result = AdmissionGateBuilder::new().capacity(0).build();
/// assert_eq!(result.unwrap_err(), ConfigError::ZeroCapacity);
/// ```
#[derive(Clone)]
pub struct AdmissionGateBuilder {
    config: LimiterConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl AdmissionGateBuilder {
    /// Creates a builder starting from [`LimiterConfig::default`].
    pub fn new() -> Self {
        Self::from_config(LimiterConfig::default())
    }

    /// Creates a builder starting from an existing configuration.
    pub fn from_config(config: LimiterConfig) -> Self {
        Self {
            config,
            clock: None,
        }
    }

    /// Sets the burst capacity per client (must be > 0).
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Sets the sustained rate per client in tokens per second (must be > 0).
    pub fn refill_rate(mut self, tokens_per_second: f64) -> Self {
        self.config.refill_rate_per_second = tokens_per_second;
        self
    }

    /// Sets how long a client may stay silent before its entry is evicted.
    pub fn idle_threshold(mut self, threshold: Duration) -> Self {
        self.config.idle_threshold = threshold;
        self
    }

    /// Sets the delay between reaper sweeps.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Sets the initial state of the on/off switch.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Injects a time source; defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates the configuration and builds the gate.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid setting.
    pub fn build(self) -> std::result::Result<AdmissionGate, ConfigError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        AdmissionGate::with_clock(self.config, clock)
    }
}

impl Default for AdmissionGateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdmissionGateBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGateBuilder")
            .field("config", &self.config)
            .field("custom_clock", &self.clock.is_some())
            .finish()
    }
}
