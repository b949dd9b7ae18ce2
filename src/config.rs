//! # Runtime configuration.
//!
//! Provides [`Config`], the settings a [`SubscriptionManager`](crate::SubscriptionManager)
//! or [`PoolDispatcher`](crate::PoolDispatcher) is built with.
//!
//! The lane count is fixed at construction: the dispatcher pool is sized
//! once and never resized, so every tid handed out by subscribers stays
//! valid for the lifetime of the process.

use crate::events::Lane;

/// Configuration for the dispatcher pool.
///
/// ## Field semantics
/// - `lanes`: number of worker lanes (fixed at construction, min 1)
/// - `lane_capacity`: per-lane task queue bound (min 1; clamped by the lane)
///
/// ## Notes
/// Fields are public; prefer the clamp helpers over sprinkling `max(1)`
/// across call sites.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of worker lanes in the pool.
    ///
    /// Tids passed to `subscribe`, `add` and `add_delayed` must be below
    /// this value. Cannot change after the pool is built.
    pub lanes: u32,

    /// Capacity of each lane's task queue.
    ///
    /// When a lane's queue is full the newest submission is dropped, the
    /// drop is counted in [`LaneStats`](crate::LaneStats) and logged.
    pub lane_capacity: usize,
}

impl Config {
    /// Returns the lane count clamped to a minimum of 1.
    #[inline]
    pub fn lanes_clamped(&self) -> u32 {
        self.lanes.max(1)
    }

    /// Returns the per-lane queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn lane_capacity_clamped(&self) -> usize {
        self.lane_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `lanes = Lane::COUNT` (the node's four lanes)
    /// - `lane_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            lanes: Lane::COUNT,
            lane_capacity: 1024,
        }
    }
}
