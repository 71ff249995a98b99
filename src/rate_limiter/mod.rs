//! # Rate Limiter Module
//!
//! Internal implementation of per-client admission control.
//!
//! ## Module Structure
//!
//! ```text
//!     rate_limiter/
//!     ├── mod.rs          (You are here - Module organization)
//!     ├── bucket.rs       (Token bucket arithmetic)
//!     ├── clock.rs        (Time sources)
//!     ├── config.rs       (Configuration and validation)
//!     ├── error.rs        (Error types)
//!     ├── gate.rs         (Admission entry point)
//!     ├── metrics.rs      (Counters and health)
//!     ├── reaper.rs       (Background idle-client eviction)
//!     └── registry.rs     (Concurrent client map)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     Request handler
//!          │ admit(identity)
//!          ▼
//!     ┌──────────┐
//!     │   Gate   │ ◄── enabled switch, clock, counters
//!     └────┬─────┘
//!          │ get_or_create (entry locked)
//!          ▼
//!     ┌──────────┐        ┌──────────┐
//!     │ Registry │ ◄───── │  Reaper  │ ◄── periodic sweep
//!     └────┬─────┘        └──────────┘
//!          │ consume(now)
//!          ▼
//!     ┌──────────┐
//!     │  Bucket  │ ◄── lazy refill, one token per request
//!     └──────────┘
//! ```

mod bucket;
mod clock;
mod config;
mod error;
mod gate;
mod metrics;
mod reaper;
mod registry;

/// Token bucket state for a single client
pub use bucket::TokenBucket;

/// Time sources
pub use clock::{Clock, ManualClock, SystemClock};

/// Configuration types and defaults
pub use config::{
    LimiterConfig, DEFAULT_CAPACITY, DEFAULT_IDLE_THRESHOLD, DEFAULT_REFILL_RATE_PER_SECOND,
    DEFAULT_SWEEP_INTERVAL, MAX_CAPACITY,
};

/// Error types
pub use error::{ConfigError, Error, ReaperError, Result};

/// Admission entry point
pub use gate::{AdmissionGate, Decision};

/// Metrics and health monitoring
pub use metrics::{GateMetrics, HealthStatus};

/// Background eviction
pub use reaper::{Reaper, REAPER_THREAD_NAME};

/// Concurrent client map
pub use registry::{ClientEntry, ClientRegistry, RegistryStats};
