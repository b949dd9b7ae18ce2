//! # A single worker lane with delayed-task support.
//!
//! Each [`Lane`] owns one worker draining a bounded FIFO queue plus a
//! [`DelayQueue`] of timed tasks. Immediate tasks run in submission order;
//! a delayed task is promoted once its deadline passes.
//!
//! ## Rules
//! - **FIFO**: immediate tasks run in the order they were submitted
//! - **Overflow**: a full queue drops the newest submission (counted, logged)
//! - **Panic isolation**: a panicking task is caught and logged; the worker
//!   keeps draining
//! - **Dispose**: cancels the worker and awaits its exit; the task in flight
//!   finishes, the rest of the queue may be dropped
//!
//! The counters in [`LaneStats`] are the metrics surface for the drop
//! policy: a growing `dropped` count is the signal to raise `lane_capacity`.

use std::future::poll_fn;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{error, trace, warn};

use crate::dispatch::{LaneTask, Tid};
use crate::error::DispatchError;

/// Commands accepted by a lane worker.
enum LaneCmd {
    /// Run as soon as the queue ahead has drained.
    Run(LaneTask),
    /// Hold in the delay queue until the deadline passes.
    RunDelayed(Duration, LaneTask),
}

/// Monotonic counters describing one lane's traffic.
#[derive(Default)]
pub struct LaneStats {
    enqueued: AtomicU64,
    executed: AtomicU64,
    dropped: AtomicU64,
    panicked: AtomicU64,
}

impl LaneStats {
    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> LaneStatsSnapshot {
        LaneStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LaneStats`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneStatsSnapshot {
    /// Tasks accepted into the queue.
    pub enqueued: u64,
    /// Tasks that ran to completion (including ones that panicked).
    pub executed: u64,
    /// Tasks refused because the queue was full or closed.
    pub dropped: u64,
    /// Tasks that panicked while running.
    pub panicked: u64,
}

/// One worker lane.
///
/// Constructed by the pool dispatcher; must be created inside a tokio
/// runtime.
pub(crate) struct Lane {
    tid: Tid,
    tx: mpsc::Sender<LaneCmd>,
    token: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<LaneStats>,
}

impl Lane {
    /// Spawns the worker and returns the lane handle.
    pub(crate) fn spawn(tid: Tid, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let token = CancellationToken::new();
        let stats = Arc::new(LaneStats::default());
        let worker = tokio::spawn(run_worker(tid, rx, token.clone(), Arc::clone(&stats)));

        Self {
            tid,
            tx,
            token,
            worker: Mutex::new(Some(worker)),
            stats,
        }
    }

    /// Enqueues `task` for immediate execution.
    pub(crate) fn submit(&self, task: LaneTask) {
        self.send(LaneCmd::Run(task));
    }

    /// Enqueues `task` to run no sooner than `delay` from now.
    pub(crate) fn submit_delayed(&self, delay: Duration, task: LaneTask) {
        self.send(LaneCmd::RunDelayed(delay, task));
    }

    /// Counters for this lane.
    pub(crate) fn stats(&self) -> &LaneStats {
        &self.stats
    }

    /// Cancels the worker and waits for it to exit. Idempotent.
    pub(crate) async fn dispose(&self) {
        self.token.cancel();
        let worker = self.worker.lock().unwrap().take();
        if let Some(handle) = worker {
            let _ = handle.await;
        }
    }

    fn send(&self, cmd: LaneCmd) {
        match self.tx.try_send(cmd) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                let err = DispatchError::QueueFull { tid: self.tid };
                warn!(tid = self.tid, label = err.as_label(), "{err}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                // Expected after dispose; stale callers observe no delivery.
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                let err = DispatchError::LaneClosed { tid: self.tid };
                trace!(tid = self.tid, label = err.as_label(), "{err}");
            }
        }
    }
}

/// Worker loop: drains the queue, promotes expired delayed tasks, exits on
/// cancellation or channel closure.
async fn run_worker(
    tid: Tid,
    mut rx: mpsc::Receiver<LaneCmd>,
    token: CancellationToken,
    stats: Arc<LaneStats>,
) {
    let mut delayed: DelayQueue<LaneTask> = DelayQueue::new();
    trace!(tid, "lane worker started");

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            Some(expired) = poll_fn(|cx| delayed.poll_expired(cx)) => {
                run_task(tid, expired.into_inner(), &stats);
            }
            cmd = rx.recv() => match cmd {
                Some(LaneCmd::Run(task)) => run_task(tid, task, &stats),
                Some(LaneCmd::RunDelayed(delay, task)) => {
                    delayed.insert(task, delay);
                }
                None => break,
            },
        }
    }

    trace!(tid, "lane worker stopped");
}

/// Runs one task, isolating panics so the lane survives them.
fn run_task(tid: Tid, task: LaneTask, stats: &LaneStats) {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(()) => {
            stats.executed.fetch_add(1, Ordering::Relaxed);
        }
        Err(panic) => {
            stats.executed.fetch_add(1, Ordering::Relaxed);
            stats.panicked.fetch_add(1, Ordering::Relaxed);
            error!(tid, info = %panic_message(&panic), "task panicked; lane continues");
        }
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
