//! # Periodic Task
//!
//! A cancellable fixed-interval background loop.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PeriodicTask                                   │
//! │                                                                         │
//! │   spawn ──► tick (immediate) ──► job() ──► wait `period` ──► tick ...   │
//! │                                    │                                    │
//! │   shutdown_tx ─── watch<bool> ─────┴──► select!: a signal ends the      │
//! │                                         loop, dropping the in-flight    │
//! │                                         job (and its child tasks)       │
//! │                                                                         │
//! │   stop()           signal + abort, returns immediately                  │
//! │   shutdown().await signal + wait for the loop to exit                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The wait is measured from the end of one job to the start of the next,
//! so a slow job never causes back-to-back runs.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Handle to a running periodic loop.
///
/// Dropping the handle closes the shutdown channel, which also ends the loop.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawns `job` onto the runtime, first run immediately, then every
    /// `period` after the previous run finishes.
    ///
    /// ## Arguments
    /// * `name` - used in log lines
    /// * `period` - pause between runs (clamped to at least 1ms)
    /// * `job` - produces one run's future
    ///
    /// ## Example
    /// ```rust,ignore
    /// let task = PeriodicTask::spawn("sync", Duration::from_secs(300), move || {
    ///     let agent = agent.clone();
    ///     async move { agent.tick().await }
    /// });
    /// ```
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(task = name, period_secs = period.as_secs(), "Periodic task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                debug!(task = name, "Periodic task run");
                tokio::select! {
                    _ = job() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            debug!(task = name, "Periodic run cancelled");
                            break;
                        }
                    }
                }

                ticker.reset();
            }

            info!(task = name, "Periodic task stopped");
        });

        PeriodicTask {
            name,
            shutdown_tx,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the loop is still alive.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signals the loop and aborts its task without waiting.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        self.handle.abort();
    }

    /// Signals the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
