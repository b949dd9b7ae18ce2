//! # Subscriber: user state plus a callback, registered in an engine.
//!
//! A [`Subscriber`] owns a piece of user state `O` and the callback invoked
//! for each delivery. The application keeps the `Arc` returned by
//! [`Subscriber::new`]; the engine only ever holds weak references, so
//! dropping that `Arc` is how a subscription ends. The `Drop` impl walks the
//! registration list and erases every record eagerly; deliveries already
//! queued behind it find the dead weak reference and do nothing.
//!
//! ## Rules
//! - Install the callback **before** the first `subscribe`; a delivery that
//!   arrives with no callback installed is dropped
//! - State is guarded by a mutex: at most one callback runs per subscriber
//!   at a time, even when its subscriptions span several lanes
//! - Do not call `subscribe`/`unsubscribe` on the same engine from inside a
//!   callback; route such work through the dispatcher instead

use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};

use crate::dispatch::{SetId, Tid};
use crate::subscription::engine::{SubscriptionEngine, SubscriptionHandle};
use crate::subscription::manager::SubscriptionManager;

/// Delivery endpoint the engine holds weakly.
///
/// Implemented by [`Subscriber`]; the engine stores `Weak<dyn Sink>` records
/// so it never extends a subscriber's lifetime.
pub trait Sink<K, P>: Send + Sync {
    /// Invoked on the lane chosen at subscribe time.
    fn on_notify(&self, set_id: SetId, key: K, payload: P);
}

type Callback<O, K, P> = Box<dyn Fn(SetId, &mut O, K, P) + Send + Sync>;

/// Callback and state live under one lock so the split borrow in
/// `on_notify` stays safe.
struct Inner<O, K, P> {
    state: O,
    callback: Option<Callback<O, K, P>>,
}

/// A subscriber owning user state `O`, bound to one `(K, P)` engine.
pub struct Subscriber<O, K, P>
where
    O: Send + 'static,
    K: Copy + Eq + Hash + Send + Sync + 'static,
    P: Clone + Send + 'static,
{
    engine: Arc<SubscriptionEngine<K, P>>,
    /// Handed to engines at subscribe time; set by `new_cyclic`.
    weak_self: Weak<Self>,
    inner: Mutex<Inner<O, K, P>>,
    registrations: Mutex<Vec<(K, SubscriptionHandle)>>,
}

impl<O, K, P> Subscriber<O, K, P>
where
    O: Send + 'static,
    K: Copy + Eq + Hash + Send + Sync + 'static,
    P: Clone + Send + 'static,
{
    /// Creates a subscriber bound to `engine`, holding `state`.
    pub fn new(engine: Arc<SubscriptionEngine<K, P>>, state: O) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            engine,
            weak_self: Weak::clone(weak_self),
            inner: Mutex::new(Inner {
                state,
                callback: None,
            }),
            registrations: Mutex::new(Vec::new()),
        })
    }

    /// Installs the callback. Call before the first `subscribe`.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(SetId, &mut O, K, P) + Send + Sync + 'static,
    {
        self.inner.lock().unwrap().callback = Some(Box::new(callback));
    }

    /// Registers this subscriber for `key`, delivering on lane `tid`.
    ///
    /// `set_id` is echoed back to the callback unchanged. The handle is
    /// recorded for drop-time cleanup.
    ///
    /// # Panics
    /// If `tid` is out of range (programmer error).
    pub fn subscribe(&self, tid: Tid, set_id: SetId, key: K) {
        let sink: Weak<dyn Sink<K, P>> = self.weak_self.clone();
        let handle = self.engine.subscribe(tid, set_id, key, sink);
        self.registrations.lock().unwrap().push((key, handle));
    }

    /// Removes all of this subscriber's registrations for `key`.
    pub fn unsubscribe(&self, key: K) {
        let mut registrations = self.registrations.lock().unwrap();
        registrations.retain(|(registered, handle)| {
            if *registered == key {
                self.engine.unsubscribe(key, *handle);
                false
            } else {
                true
            }
        });
    }

    /// Runs `f` against the current state.
    ///
    /// Takes the same lock as deliveries, so the view is consistent with
    /// whatever callbacks have already completed.
    pub fn with_state<R>(&self, f: impl FnOnce(&O) -> R) -> R {
        f(&self.inner.lock().unwrap().state)
    }

    /// The engine this subscriber is bound to.
    pub fn engine(&self) -> Arc<SubscriptionEngine<K, P>> {
        Arc::clone(&self.engine)
    }
}

impl<O, K, P> Sink<K, P> for Subscriber<O, K, P>
where
    O: Send + 'static,
    K: Copy + Eq + Hash + Send + Sync + 'static,
    P: Clone + Send + 'static,
{
    fn on_notify(&self, set_id: SetId, key: K, payload: P) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        if let Some(callback) = &inner.callback {
            callback(set_id, &mut inner.state, key, payload);
        }
    }
}

impl<O, K, P> Drop for Subscriber<O, K, P>
where
    O: Send + 'static,
    K: Copy + Eq + Hash + Send + Sync + 'static,
    P: Clone + Send + 'static,
{
    fn drop(&mut self) {
        let registrations = std::mem::take(&mut *self.registrations.lock().unwrap());
        for (key, handle) in registrations {
            self.engine.unsubscribe(key, handle);
        }
    }
}

/// Builds a ready-to-fire subscriber in one call.
///
/// Fetches the `(K, P)` engine from `manager`, constructs the subscriber
/// around `state`, installs a callback that forwards the payload to `f`,
/// and subscribes to `key` on lane `tid` with set id 0. The delivered key
/// always equals `key` for a single-key registration, which the installed
/// callback asserts in debug builds.
pub fn create_subscriber<O, K, P, F>(
    manager: &SubscriptionManager,
    key: K,
    tid: Tid,
    state: O,
    f: F,
) -> Arc<Subscriber<O, K, P>>
where
    O: Send + 'static,
    K: Copy + Eq + Hash + Send + Sync + 'static,
    P: Clone + Send + 'static,
    F: Fn(&mut O, P) + Send + Sync + 'static,
{
    let subscriber = Subscriber::new(manager.engine::<K, P>(), state);
    subscriber.set_callback(move |_set_id, state, event_key, payload| {
        debug_assert!(event_key == key);
        f(state, payload);
    });
    subscriber.subscribe(tid, 0, key);
    subscriber
}
