//! # Error Types
//!
//! Admission itself never fails: a rejected request is a normal
//! [`Decision::Reject`](super::Decision), not an error. The errors here cover
//! the two places where something can genuinely go wrong:
//!
//! - building a gate from a bad [`LimiterConfig`](super::LimiterConfig)
//! - running the background reaper thread

use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for anything the crate can report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The limiter configuration was rejected at construction time.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The background reaper could not be started or did not exit cleanly.
    #[error(transparent)]
    Reaper(#[from] ReaperError),
}

/// Construction-time misconfiguration.
///
/// Each variant corresponds to a setting that would otherwise produce a
/// limiter that never admits or admits without bound.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Burst capacity of zero means no request could ever be admitted.
    #[error("capacity must be greater than 0")]
    ZeroCapacity,

    /// Beyond 2^53 a floating-point token count cannot be decremented by one.
    #[error("capacity {0} exceeds the largest supported burst of 2^53 tokens")]
    CapacityTooLarge(u64),

    /// The refill rate must be a finite, strictly positive number.
    #[error("refill rate must be a finite positive number of tokens per second, got {0}")]
    InvalidRefillRate(f64),

    /// A zero sweep interval would spin the reaper in a hot loop.
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,

    /// A zero idle threshold would evict clients between two requests.
    #[error("idle threshold must be greater than zero, got {0:?}")]
    ZeroIdleThreshold(Duration),
}

/// Failures of the background reaper thread.
#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    /// The operating system refused to spawn the thread.
    #[error("failed to spawn reaper thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The reaper loop panicked; the payload message is preserved if it was a string.
    #[error("reaper thread panicked: {0}")]
    Panicked(String),
}
