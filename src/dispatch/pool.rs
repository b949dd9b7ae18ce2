//! # Pool dispatcher: one worker lane per tid.
//!
//! Owns a fixed set of [`Lane`] workers sized by [`Config::lanes`]. `add`
//! and `add_delayed` forward to the lane at index `tid`; `dispose` cancels
//! every lane and awaits all workers together.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::config::Config;
use crate::dispatch::lane::Lane;
use crate::dispatch::{Dispatch, LaneStatsSnapshot, LaneTask, Tid};

/// Asynchronous dispatcher backed by a fixed pool of worker lanes.
///
/// Must be constructed inside a tokio runtime (each lane spawns a worker).
/// The lane count is fixed for the dispatcher's lifetime.
pub struct PoolDispatcher {
    lanes: Vec<Lane>,
}

impl PoolDispatcher {
    /// Builds the pool: `cfg.lanes` lanes, each with a queue bound of
    /// `cfg.lane_capacity`.
    pub fn new(cfg: &Config) -> Self {
        let capacity = cfg.lane_capacity_clamped();
        let lanes = (0..cfg.lanes_clamped())
            .map(|tid| Lane::spawn(tid, capacity))
            .collect();

        Self { lanes }
    }

    /// Snapshot of the counters for lane `tid`.
    ///
    /// # Panics
    /// If `tid` is out of range.
    pub fn stats(&self, tid: Tid) -> LaneStatsSnapshot {
        self.check_tid(tid);
        self.lanes[tid as usize].stats().snapshot()
    }
}

#[async_trait]
impl Dispatch for PoolDispatcher {
    fn lanes(&self) -> u32 {
        self.lanes.len() as u32
    }

    fn add(&self, tid: Tid, task: LaneTask) {
        self.check_tid(tid);
        self.lanes[tid as usize].submit(task);
    }

    fn add_delayed(&self, tid: Tid, delay: Duration, task: LaneTask) {
        self.check_tid(tid);
        self.lanes[tid as usize].submit_delayed(delay, task);
    }

    async fn dispose(&self) {
        join_all(self.lanes.iter().map(Lane::dispose)).await;
    }
}
