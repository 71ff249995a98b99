//! # Gate Metrics
//!
//! Point-in-time counters for an [`AdmissionGate`](super::AdmissionGate):
//! how many checks were allowed, rejected, or bypassed while limiting was
//! switched off, plus the registry's client churn.
//!
//! ```text
//!     Admission Dashboard:
//!     ┌─────────────────────────────────────┐
//!     │  Allowed:   950  Rejected:  50      │
//!     │  Rejection Rate: 5.00%              │
//!     │  ▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓░  (95/100)     │
//!     │                                     │
//!     │  Clients: 120 active / 4000 created │
//!     │  Health: ✅ Healthy                 │
//!     └─────────────────────────────────────┘
//! ```

use std::fmt;

/// Rejection rate above which the gate is considered degraded.
const DEGRADED_REJECTION_RATE: f64 = 0.1;

/// Rejection rate above which the gate is considered critical.
const CRITICAL_REJECTION_RATE: f64 = 0.5;

/// Snapshot of admission counters.
///
/// ## Example Usage
///
/// ```rust
/// use turnstile::{AdmissionGate, LimiterConfig};
///
/// let gate = AdmissionGate::new(LimiterConfig::new(2, 1.0)).unwrap();
/// for _ in 0..3 {
///     let _ = gate.admit("10.0.0.1");
/// }
///
/// let metrics = gate.metrics();
/// assert_eq!(metrics.total_allowed, 2);
/// assert_eq!(metrics.total_rejected, 1);
/// println!("{}", metrics.summary());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GateMetrics {
    /// Checks that returned `Allow` with limiting enabled.
    pub total_allowed: u64,

    /// Checks that returned `Reject`.
    pub total_rejected: u64,

    /// Checks that skipped the registry because limiting was disabled.
    pub total_bypassed: u64,

    /// Clients currently tracked by the registry.
    pub active_clients: usize,

    /// Client entries created since startup.
    pub total_created: u64,

    /// Client entries evicted since startup.
    pub total_evicted: u64,
}

impl GateMetrics {
    /// Checks that went through the token buckets (bypassed excluded).
    #[inline]
    pub fn total_limited(&self) -> u64 {
        self.total_allowed + self.total_rejected
    }

    /// Every check, bypassed included.
    #[inline]
    pub fn total_checks(&self) -> u64 {
        self.total_limited() + self.total_bypassed
    }

    /// Fraction of limited checks that were allowed, 1.0 when none happened.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        let total = self.total_limited();
        if total == 0 {
            1.0
        } else {
            self.total_allowed as f64 / total as f64
        }
    }

    /// Fraction of limited checks that were rejected.
    #[inline]
    pub fn rejection_rate(&self) -> f64 {
        1.0 - self.success_rate()
    }

    /// Whether a noticeable share of traffic is being turned away.
    #[inline]
    pub fn is_under_pressure(&self) -> bool {
        self.rejection_rate() > DEGRADED_REJECTION_RATE
    }

    /// Three-level assessment derived from the rejection rate.
    ///
    /// # Example
    ///
    /// ```rust
    /// use turnstile::{GateMetrics, HealthStatus};
    ///
    /// let metrics = GateMetrics {
    ///     total_allowed: 40,
    ///     total_rejected: 60,
    ///     total_bypassed: 0,
    ///     active_clients: 3,
    ///     total_created: 3,
    ///     total_evicted: 0,
    /// };
    /// assert_eq!(metrics.health_status(), HealthStatus::Critical);
    /// ```
    pub fn health_status(&self) -> HealthStatus {
        let rate = self.rejection_rate();
        if rate > CRITICAL_REJECTION_RATE {
            HealthStatus::Critical
        } else if rate > DEGRADED_REJECTION_RATE {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Human-readable multi-line report.
    pub fn summary(&self) -> String {
        format!(
            "Admission Gate Metrics:\n\
             ├─ Decisions:\n\
             │  ├─ Allowed: {}\n\
             │  ├─ Rejected: {}\n\
             │  ├─ Bypassed: {}\n\
             │  └─ Rejection Rate: {:.2}%\n\
             ├─ Clients:\n\
             │  ├─ Active: {}\n\
             │  ├─ Created: {}\n\
             │  └─ Evicted: {}\n\
             └─ Health: {}",
            self.total_allowed,
            self.total_rejected,
            self.total_bypassed,
            self.rejection_rate() * 100.0,
            self.active_clients,
            self.total_created,
            self.total_evicted,
            self.health_status(),
        )
    }
}

impl fmt::Display for GateMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Health indicator for an admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Rejections are rare.
    Healthy,

    /// More than 10% of limited checks are rejected.
    Degraded,

    /// More than half of limited checks are rejected.
    Critical,
}

impl HealthStatus {
    /// Whether enough clients are being turned away to warrant a look.
    pub fn is_unhealthy(&self) -> bool {
        self != &Self::Healthy
    }

    /// What an operator should look at, given how many checks end in a 429.
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::Healthy => "Limits fit current traffic",
            Self::Degraded => {
                "Some clients exceed their burst; review per-client capacity against real traffic"
            }
            Self::Critical => {
                "Most limited checks are rejected; look for a single noisy identity \
                 (e.g. a shared proxy address) before raising the refill rate"
            }
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "✅ Healthy"),
            Self::Degraded => write!(f, "⚠️ Degraded"),
            Self::Critical => write!(f, "🔴 Critical"),
        }
    }
}
