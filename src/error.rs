//! # Error types used by the lanebus runtime.
//!
//! [`DispatchError`] classifies why a lane refused a submitted task. None of
//! these variants ever reach a publisher: `notify` has no return value, so a
//! refused submission is logged at the lane boundary, counted in the lane
//! statistics, and dropped.
//!
//! `as_label()` returns a short stable string for log fields and metric
//! labels.

use thiserror::Error;

use crate::dispatch::Tid;

/// Reasons a lane did not accept a task.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The lane's bounded queue was full; the task was dropped.
    #[error("lane {tid} queue is full; task dropped")]
    QueueFull {
        /// Target lane.
        tid: Tid,
    },

    /// The lane was disposed; the task was dropped.
    ///
    /// Expected during shutdown: callers holding stale dispatcher references
    /// observe no delivery.
    #[error("lane {tid} is closed; task dropped")]
    LaneClosed {
        /// Target lane.
        tid: Tid,
    },

    /// A tid outside `[0, lanes)` was passed to the dispatcher.
    ///
    /// This is a programmer error; the dispatcher raises it as a fatal
    /// assertion rather than returning it.
    #[error("tid {tid} out of range (lanes = {lanes})")]
    TidOutOfRange {
        /// Offending tid.
        tid: Tid,
        /// Number of lanes the dispatcher was built with.
        lanes: u32,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::QueueFull { .. } => "lane_queue_full",
            DispatchError::LaneClosed { .. } => "lane_closed",
            DispatchError::TidOutOfRange { .. } => "lane_tid_out_of_range",
        }
    }
}
