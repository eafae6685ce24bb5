//! Periodic background tasks.
//!
//! A worker is a [`Sweep`] run on a fixed interval until the shared shutdown
//! signal flips. A sweep handles its own per-record failures; the loop itself
//! never stops because of one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome counters of a single sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Records looked at.
    pub scanned: usize,
    /// Records the sweep acted on successfully.
    pub applied: usize,
    /// Records that changed since they were listed.
    pub skipped: usize,
    /// Records whose action failed for any other reason.
    pub failed: usize,
}

/// One pass of a background worker.
pub trait Sweep: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn sweep(&self, now: DateTime<Utc>) -> SweepReport;
}

/// Run `sweeper` every `period` until `shutdown` becomes `true` or its sender is dropped.
///
/// The first sweep happens immediately.
pub async fn run_periodically<S: Sweep>(
    sweeper: S,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(worker = sweeper.name(), ?period, "worker started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = sweeper.sweep(Utc::now());
                debug!(
                    worker = sweeper.name(),
                    scanned = report.scanned,
                    applied = report.applied,
                    skipped = report.skipped,
                    failed = report.failed,
                    "sweep finished"
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(worker = sweeper.name(), "worker stopped");
}

/// Spawned workers sharing one shutdown signal.
pub struct Workers {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn spawn<S: Sweep>(&mut self, sweeper: S, period: Duration) {
        let shutdown = self.shutdown.subscribe();
        self.handles
            .push(tokio::spawn(run_periodically(sweeper, period, shutdown)));
    }

    /// Signal every worker and wait for them to finish their current sweep.
    ///
    /// Returns how many workers had already died from a panic.
    pub async fn shutdown(self) -> usize {
        let _ = self.shutdown.send(true);
        let mut panicked = 0;
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(reason = %e, "worker panicked");
                panicked += 1;
            }
        }
        panicked
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::new()
    }
}
