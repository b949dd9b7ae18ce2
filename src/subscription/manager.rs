//! # Process-wide owner of the dispatcher and the engine family.
//!
//! [`SubscriptionManager`] memoizes one [`SubscriptionEngine`] per
//! `(event key, payload)` type pair and hands out the dispatcher they all
//! share. Engines are created lazily on first request; repeated requests
//! with the same type pair return the same engine.
//!
//! The manager is injectable: build one with [`SubscriptionManager::new`]
//! and thread it through the application. [`subscription`] memoizes a single
//! process-wide instance as a convenience for the application entry point.
//!
//! ## Teardown
//! `dispose` stops the dispatcher lanes first (the task in flight on each
//! lane finishes), then drops the engines. Idempotent; late submissions are
//! dropped silently by the closed lanes.

use std::any::{Any, TypeId};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::config::Config;
use crate::dispatch::{Dispatch, PoolDispatcher};
use crate::subscription::engine::SubscriptionEngine;

static SUBSCRIPTION: OnceLock<Arc<SubscriptionManager>> = OnceLock::new();

/// Returns the process-wide manager, creating it on first call.
///
/// The first call must happen inside the tokio runtime: creation spawns the
/// dispatcher pool's lane workers. Prefer passing a manager explicitly;
/// this accessor exists for the application entry point.
pub fn subscription() -> Arc<SubscriptionManager> {
    Arc::clone(SUBSCRIPTION.get_or_init(|| SubscriptionManager::new(Config::default())))
}

/// Owns the dispatcher plus the memoized engines, keyed by type pair.
pub struct SubscriptionManager {
    dispatcher: Arc<dyn Dispatch>,
    engines: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    disposed: AtomicBool,
}

impl SubscriptionManager {
    /// Builds a manager over a fresh [`PoolDispatcher`].
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(cfg: Config) -> Arc<Self> {
        Self::with_dispatcher(Arc::new(PoolDispatcher::new(&cfg)))
    }

    /// Builds a manager over an existing dispatcher.
    ///
    /// This is how tests swap in the [`SyncDispatcher`](crate::SyncDispatcher).
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatch>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            engines: DashMap::new(),
            disposed: AtomicBool::new(false),
        })
    }

    /// The engine for the `(K, P)` family, created on first request.
    pub fn engine<K, P>(&self) -> Arc<SubscriptionEngine<K, P>>
    where
        K: Copy + Eq + Hash + Send + Sync + 'static,
        P: Clone + Send + 'static,
    {
        let erased = self
            .engines
            .entry(TypeId::of::<(K, P)>())
            .or_insert_with(|| {
                let engine: Arc<dyn Any + Send + Sync> =
                    SubscriptionEngine::<K, P>::new(Arc::clone(&self.dispatcher));
                engine
            })
            .value()
            .clone();

        erased
            .downcast::<SubscriptionEngine<K, P>>()
            .ok()
            .expect("engine registry is keyed by the (K, P) type pair")
    }

    /// The dispatcher shared by every engine.
    pub fn dispatcher(&self) -> Arc<dyn Dispatch> {
        Arc::clone(&self.dispatcher)
    }

    /// Stops the dispatcher lanes, then drops all engines. Idempotent.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.dispatcher.dispose().await;
        self.engines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SyncDispatcher;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum Key {
        A,
    }

    #[test]
    fn engines_are_memoized_per_type_pair() {
        let manager = SubscriptionManager::with_dispatcher(Arc::new(SyncDispatcher::new(1)));

        let first = manager.engine::<Key, u32>();
        let again = manager.engine::<Key, u32>();
        assert!(Arc::ptr_eq(&first, &again));

        let other = manager.engine::<Key, String>();
        assert_eq!(other.size(), 0);
        assert_eq!(manager.engines.len(), 2);
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_drops_engines() {
        let manager = SubscriptionManager::new(Config::default());
        let _ = manager.engine::<Key, u32>();
        assert_eq!(manager.engines.len(), 1);

        manager.dispose().await;
        assert_eq!(manager.engines.len(), 0);
        manager.dispose().await;
    }

    #[tokio::test]
    async fn process_wide_accessor_returns_one_instance() {
        let first = subscription();
        let second = subscription();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.dispatcher().lanes(), Config::default().lanes);
    }
}
