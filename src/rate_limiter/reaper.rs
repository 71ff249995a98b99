//! # Idle Client Reaper
//!
//! A background thread that keeps the registry from growing without bound
//! when many distinct clients come and go.
//!
//! ```text
//!     ┌──────────────┐   sweep_interval   ┌──────────────┐
//!     │  wait / stop │ ─────────────────► │    sweep     │
//!     └──────▲───────┘                    └──────┬───────┘
//!            └───────────────────────────────────┘
//!
//!     stop() / drop ──► channel message ──► loop exits ──► thread joined
//! ```
//!
//! The wait is a `recv_timeout` on a stop channel, so a stop request wakes
//! the thread immediately instead of after the current interval.

use super::clock::Clock;
use super::error::ReaperError;
use super::registry::ClientRegistry;
use std::any::Any;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Name given to the reaper thread.
pub const REAPER_THREAD_NAME: &str = "turnstile-reaper";

/// Handle to a running reaper thread.
///
/// Dropping the handle stops the thread and waits for it. Call
/// [`Reaper::stop`] instead to observe a panic inside the loop.
///
/// # Example
///
/// ```rust
/// use turnstile::{AdmissionGate, LimiterConfig};
/// use std::time::Duration;
///
/// let gate = AdmissionGate::new(
///     LimiterConfig::default().with_sweep_interval(Duration::from_millis(50)),
/// ).unwrap();
///
/// let reaper = gate.spawn_reaper().unwrap();
/// assert!(reaper.is_running());
///
/// reaper.stop().unwrap();
/// ```
pub struct Reaper {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
    sweep_interval: Duration,
    idle_threshold: Duration,
}

impl Reaper {
    /// Spawns the sweep loop on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`ReaperError::Spawn`] if the thread cannot be created.
    pub fn spawn(
        registry: Arc<ClientRegistry>,
        clock: Arc<dyn Clock>,
        sweep_interval: Duration,
        idle_threshold: Duration,
    ) -> Result<Self, ReaperError> {
        let (stop_tx, stop_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(REAPER_THREAD_NAME.to_string())
            .spawn(move || {
                info!(
                    "Started reaper (interval: {:?}, idle threshold: {:?})",
                    sweep_interval, idle_threshold
                );

                loop {
                    match stop_rx.recv_timeout(sweep_interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            info!("Reaper stopping");
                            break;
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            let removed = registry.sweep(idle_threshold, clock.now());
                            debug!(
                                "Reaper sweep removed {} clients ({} remaining)",
                                removed,
                                registry.len()
                            );
                        }
                    }
                }
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
            sweep_interval,
            idle_threshold,
        })
    }

    /// Whether the reaper thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Delay between sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Idle duration after which clients are evicted.
    pub fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }

    /// Signals the thread to exit and waits for it.
    ///
    /// # Errors
    ///
    /// Returns [`ReaperError::Panicked`] if the sweep loop panicked.
    pub fn stop(mut self) -> Result<(), ReaperError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), ReaperError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // The thread may already be gone; a send error just means that
        let _ = self.stop_tx.send(());

        handle
            .join()
            .map_err(|payload| ReaperError::Panicked(panic_message(payload.as_ref())))
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("{}", err);
        }
    }
}

impl fmt::Debug for Reaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaper")
            .field("running", &self.is_running())
            .field("sweep_interval", &self.sweep_interval)
            .field("idle_threshold", &self.idle_threshold)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
