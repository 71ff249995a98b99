//! # Limiter Configuration
//!
//! Settings for the admission gate, supplied once at construction.
//!
//! ## Key Concepts
//!
//! ```text
//!     Per-client bucket:
//!
//!     ┌──────────────────────────────┐
//!     │   Capacity                   │ ← Burst limit
//!     │   ┌─────────────────────┐    │
//!     │   │ 🪙 🪙 🪙 🪙          │    │ ← Current tokens
//!     │   └─────────────────────┘    │
//!     │   Refill: 2.0 tokens/sec     │ ← Continuous, lazy
//!     └──────────────────────────────┘
//!
//!     Registry housekeeping:
//!
//!     sweep_interval ──► how often the reaper wakes up
//!     idle_threshold ──► how long a client may stay silent
//! ```
//!
//! The two housekeeping durations are independent. The defaults keep the
//! usual 1:3 ratio (sweep every minute, evict after three minutes) but
//! nothing derives one from the other.

use super::error::ConfigError;
use std::time::Duration;

/// Default burst capacity per client.
pub const DEFAULT_CAPACITY: u64 = 4;

/// Default sustained rate per client, in tokens per second.
pub const DEFAULT_REFILL_RATE_PER_SECOND: f64 = 2.0;

/// Largest burst capacity a bucket can count down exactly.
///
/// Tokens are held as `f64`; above 2^53 subtracting one token no longer
/// changes the stored value and the bucket would never drain.
pub const MAX_CAPACITY: u64 = 1 << 53;

/// Default delay between two reaper sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default inactivity after which a client entry is evicted.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(180);

/// Configuration for an [`AdmissionGate`](super::AdmissionGate).
///
/// ## Examples
///
/// ```rust
/// use turnstile::LimiterConfig;
/// use std::time::Duration;
///
/// // 10 req/sec sustained, bursts of 20
/// let config = LimiterConfig::per_second(10.0);
///
/// // 600 req/min with a custom burst and faster housekeeping
/// let config = LimiterConfig::per_minute(600)
///     .with_capacity(50)
///     .with_sweep_interval(Duration::from_secs(15))
///     .with_idle_threshold(Duration::from_secs(45));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterConfig {
    /// Maximum number of tokens a client bucket can hold (burst size).
    pub capacity: u64,

    /// Tokens added to each bucket per second of elapsed time.
    pub refill_rate_per_second: f64,

    /// Clients silent for longer than this are removed by the reaper.
    pub idle_threshold: Duration,

    /// How long the reaper sleeps between sweeps.
    pub sweep_interval: Duration,

    /// Initial value of the runtime on/off switch.
    ///
    /// The gate copies this into an atomic flag that can be toggled at any
    /// time with [`AdmissionGate::set_enabled`](super::AdmissionGate::set_enabled).
    pub enabled: bool,
}

impl Default for LimiterConfig {
    /// Burst of 4, 2 requests/second, sweep every minute, evict after
    /// three idle minutes, limiting enabled.
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_rate_per_second: DEFAULT_REFILL_RATE_PER_SECOND,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            enabled: true,
        }
    }
}

impl LimiterConfig {
    /// Creates a configuration with the given bucket parameters and default
    /// housekeeping.
    ///
    /// # Example
    ///
    /// ```rust
    /// use turnstile::LimiterConfig;
    ///
    /// // Burst of 100, 20 requests/second sustained
    /// let config = LimiterConfig::new(100, 20.0);
    /// assert_eq!(config.capacity, 100);
    /// ```
    pub fn new(capacity: u64, refill_rate_per_second: f64) -> Self {
        Self {
            capacity,
            refill_rate_per_second,
            ..Default::default()
        }
    }

    /// Per-second limiting with a burst capacity of twice the rate.
    ///
    /// The burst is rounded up so that fractional rates still admit at
    /// least one request.
    pub fn per_second(requests_per_second: f64) -> Self {
        let capacity = (requests_per_second * 2.0).ceil().max(1.0) as u64;
        Self::new(capacity, requests_per_second)
    }

    /// Per-minute limiting; a full minute's quota may be spent as one burst.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::new(
            u64::from(requests_per_minute),
            f64::from(requests_per_minute) / 60.0,
        )
    }

    /// Sets the burst capacity.
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the sustained refill rate in tokens per second.
    pub fn with_refill_rate(mut self, tokens_per_second: f64) -> Self {
        self.refill_rate_per_second = tokens_per_second;
        self
    }

    /// Sets how long a client may stay idle before eviction.
    pub fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    /// Sets the delay between reaper sweeps.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the initial state of the on/off switch.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validates the configuration.
    ///
    /// Called automatically when a gate is built.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroCapacity`] if `capacity` is 0
    /// - [`ConfigError::CapacityTooLarge`] if `capacity` exceeds [`MAX_CAPACITY`]
    /// - [`ConfigError::InvalidRefillRate`] if the rate is not finite or not positive
    /// - [`ConfigError::ZeroSweepInterval`] if `sweep_interval` is zero
    /// - [`ConfigError::ZeroIdleThreshold`] if `idle_threshold` is zero
    ///
    /// # Example
    ///
    /// ```rust
    /// use turnstile::{ConfigError, LimiterConfig};
    ///
    /// let config = LimiterConfig::new(0, 10.0);
    /// assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge(self.capacity));
        }

        let rate = self.refill_rate_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRefillRate(rate));
        }

        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }

        if self.idle_threshold.is_zero() {
            return Err(ConfigError::ZeroIdleThreshold(self.idle_threshold));
        }

        Ok(())
    }

    /// Returns the sustained rate per second.
    pub fn effective_rate_per_second(&self) -> f64 {
        self.refill_rate_per_second
    }

    /// Time needed to earn back a single token.
    ///
    /// Returns `None` when the rate is not a positive finite number.
    pub fn time_per_token(&self) -> Option<Duration> {
        let rate = self.refill_rate_per_second;
        if rate.is_finite() && rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / rate).ok()
        } else {
            None
        }
    }
}
