//! # Task dispatch: lanes and dispatcher variants.
//!
//! A **lane** is a single worker draining a FIFO task queue; a **dispatcher**
//! routes each task to the lane named by its tid. Engines hold the dispatcher
//! as `Arc<dyn Dispatch>` so the pool variant can be swapped for the inline
//! one in tests.
//!
//! ## Architecture
//! ```text
//! engine.notify(key, payload)
//!     │ one closure per live subscriber record
//!     ▼
//! dispatcher.add(tid, task) ──► [lane 0 queue] ──► worker ──► task()
//!                          ├──► [lane 1 queue] ──► worker ──► task()
//!                          └──► [lane N queue] ──► worker ──► task()
//! ```
//!
//! ## Rules
//! - Tasks submitted to one lane from one thread run in submission order
//! - No ordering across lanes
//! - A task that panics is caught and logged; the lane continues
//! - After `dispose`, submissions are silently dropped (and counted)

mod lane;
mod pool;
mod sync;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DispatchError;

pub use lane::{LaneStats, LaneStatsSnapshot};
pub use pool::PoolDispatcher;
pub use sync::SyncDispatcher;

/// Index of a worker lane, in `[0, lanes)`.
pub type Tid = u32;

/// Identifier grouping the subscriptions made by one subscriber.
///
/// Opaque to the runtime; echoed back to the callback so a subscriber can
/// tell which logical registration fired.
pub type SetId = u32;

/// A unit of work routed to a lane.
pub type LaneTask = Box<dyn FnOnce() + Send + 'static>;

/// Routes tasks to worker lanes.
///
/// Implementations:
/// - [`PoolDispatcher`]: one worker per lane, asynchronous delivery
/// - [`SyncDispatcher`]: inline execution on the caller's thread (tests)
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    /// Number of lanes this dispatcher was built with.
    fn lanes(&self) -> u32;

    /// Routes `task` to lane `tid` for immediate execution.
    fn add(&self, tid: Tid, task: LaneTask);

    /// Routes `task` to lane `tid` to run no sooner than `delay` from now.
    ///
    /// The delay is a lower bound; the upper bound is unbounded but
    /// typically small.
    fn add_delayed(&self, tid: Tid, delay: Duration, task: LaneTask);

    /// Stops all lanes and waits for their workers to exit.
    ///
    /// Idempotent. Tasks still queued when the lanes stop may be dropped;
    /// submissions made afterwards are dropped silently.
    async fn dispose(&self);

    /// Asserts that `tid` names a lane.
    ///
    /// A tid out of range is a programmer error, raised as a fatal
    /// assertion as early as possible.
    fn check_tid(&self, tid: Tid) {
        let lanes = self.lanes();
        assert!(
            tid < lanes,
            "{}",
            DispatchError::TidOutOfRange { tid, lanes }
        );
    }
}
