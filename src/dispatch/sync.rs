//! # Synchronous dispatcher: inline execution for deterministic tests.
//!
//! Executes every task on the caller's thread before returning. The tid is
//! ignored, a delay is ignored, and `dispose` is a no-op, so a `notify`
//! through this dispatcher has fully completed, callbacks included, by the
//! time it returns. Recursive `notify` from inside a callback simply nests.

use std::time::Duration;

use async_trait::async_trait;

use crate::dispatch::{Dispatch, LaneTask, Tid};
use crate::events::Lane;

/// Inline dispatcher used for deterministic tests.
pub struct SyncDispatcher {
    lanes: u32,
}

impl SyncDispatcher {
    /// Reports `lanes` lanes for tid range checks; nothing is spawned.
    pub fn new(lanes: u32) -> Self {
        Self {
            lanes: lanes.max(1),
        }
    }
}

impl Default for SyncDispatcher {
    fn default() -> Self {
        Self::new(Lane::COUNT)
    }
}

#[async_trait]
impl Dispatch for SyncDispatcher {
    fn lanes(&self) -> u32 {
        self.lanes
    }

    fn add(&self, _tid: Tid, task: LaneTask) {
        task();
    }

    fn add_delayed(&self, _tid: Tid, _delay: Duration, task: LaneTask) {
        task();
    }

    async fn dispose(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn add_runs_inline() {
        let sync = SyncDispatcher::default();
        let flag = std::sync::Arc::new(AtomicBool::new(false));
        let flag_clone = std::sync::Arc::clone(&flag);
        // tid is ignored by the inline variant
        sync.add(3, Box::new(move || flag_clone.store(true, Ordering::SeqCst)));
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn delayed_runs_inline_ignoring_the_delay() {
        let sync = SyncDispatcher::new(1);
        let flag = std::sync::Arc::new(AtomicBool::new(false));
        let flag_clone = std::sync::Arc::clone(&flag);
        sync.add_delayed(
            0,
            Duration::from_secs(3600),
            Box::new(move || flag_clone.store(true, Ordering::SeqCst)),
        );
        assert!(flag.load(Ordering::SeqCst));
    }
}
