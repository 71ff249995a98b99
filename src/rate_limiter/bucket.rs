//! # Token Bucket
//!
//! The per-client rate state. A bucket holds up to `capacity` tokens, each
//! admitted request spends one, and tokens flow back in continuously at
//! `refill_rate_per_second`.
//!
//! ```text
//!     capacity = 4, rate = 2/s
//!
//!     t=0.0s   [🪙🪙🪙🪙]  4 requests ──► ✅✅✅✅
//!     t=0.0s   [        ]  5th        ──► ❌ (tokens stay at 0)
//!     t=0.5s   [🪙      ]  +1 token   ──► ✅
//!     t=0.5s   [        ]  next       ──► ❌
//! ```
//!
//! ## Lazy Refill
//!
//! There is no ticking task per bucket. Every `consume` first credits the
//! tokens earned since the previous call, capped at capacity, then tries to
//! spend one. Because the credit is computed from the real elapsed time the
//! sustained rate is exact no matter how irregular the access pattern is.
//!
//! The bucket has no synchronization of its own; the registry guards it.

use std::time::Instant;

/// Token bucket state for one client.
///
/// # Example
///
/// ```rust
/// use turnstile::TokenBucket;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut bucket = TokenBucket::new(2, 1.0, start);
///
/// assert!(bucket.consume(start));
/// assert!(bucket.consume(start));
/// assert!(!bucket.consume(start));
///
/// // One second later a single token has come back
/// let later = start + Duration::from_secs(1);
/// assert!(bucket.consume(later));
/// assert!(!bucket.consume(later));
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u64,
    refill_rate_per_second: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket.
    ///
    /// The parameters are expected to come from a validated
    /// [`LimiterConfig`](super::LimiterConfig); a zero capacity yields a
    /// bucket that never admits.
    pub fn new(capacity: u64, refill_rate_per_second: f64, now: Instant) -> Self {
        debug_assert!(
            refill_rate_per_second.is_finite() && refill_rate_per_second > 0.0,
            "refill rate must be positive and finite"
        );

        Self {
            capacity,
            refill_rate_per_second,
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    /// Refills for the time elapsed since the last call, then tries to spend
    /// one token.
    ///
    /// Returns `true` if a token was spent. On `false` the token count is
    /// left as it was after the refill; it never goes negative.
    ///
    /// An instant earlier than the last refill counts as zero elapsed time
    /// and does not move `last_refill` backwards.
    #[inline]
    pub fn consume(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    #[inline]
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }

        let capacity = self.capacity as f64;
        let earned = elapsed.as_secs_f64() * self.refill_rate_per_second;
        self.tokens = (self.tokens + earned).min(capacity);
        self.last_refill = now;
    }

    /// Tokens currently held, as of the last refill.
    #[inline]
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Tokens that would be held at `now`, without mutating the bucket.
    pub fn tokens_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        (self.tokens + elapsed.as_secs_f64() * self.refill_rate_per_second)
            .min(self.capacity as f64)
    }

    /// Maximum burst size.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Sustained refill rate.
    #[inline]
    pub fn refill_rate_per_second(&self) -> f64 {
        self.refill_rate_per_second
    }

    /// Instant of the last refill.
    #[inline]
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    /// Whether the bucket is back at full capacity at `now`.
    pub fn is_full_at(&self, now: Instant) -> bool {
        self.tokens_at(now) >= self.capacity as f64
    }
}
