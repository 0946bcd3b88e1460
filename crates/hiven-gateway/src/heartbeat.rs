//! Periodic keep-alive.
//!
//! The scheduler stores an interval and runs at most one ticking task. Changing
//! the stored interval never touches a running task; it applies to the next
//! [`HeartbeatScheduler::start`].

use crate::codec::Envelope;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Sends `{op:3}` into the outbound queue at a fixed period.
pub struct HeartbeatScheduler {
    /// Interval for the next start, in milliseconds.
    interval_ms: AtomicU64,

    /// Running ticker.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for HeartbeatScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatScheduler")
            .field("interval", &self.interval())
            .field("running", &self.is_running())
            .finish()
    }
}

impl HeartbeatScheduler {
    /// Create a stopped scheduler with a default interval.
    pub fn new(default_interval: Duration) -> Self {
        Self {
            interval_ms: AtomicU64::new(default_interval.as_millis() as u64),
            task: Mutex::new(None),
        }
    }

    /// Interval the next start will use.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// Store a new interval for the next start.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    /// Start ticking every `interval`, replacing any running ticker.
    ///
    /// The first heartbeat goes out one full period after the call. The ticker
    /// stops by itself once `sender`'s receiver is gone.
    pub fn start(&self, interval: Duration, sender: mpsc::UnboundedSender<Envelope>) {
        // tokio intervals panic on a zero period
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if sender.send(Envelope::heartbeat()).is_err() {
                    debug!("Connection gone, stopping heartbeat");
                    break;
                }
                trace!("Heartbeat queued");
            }
        });

        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }
        debug!("Heartbeat started every {:?}", period);
    }

    /// Stop ticking. Safe to call when stopped.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            debug!("Heartbeat stopped");
        }
    }

    /// Whether a ticker is running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
