//! # Subscriber registry for one `(event key, payload)` family.
//!
//! Maps each event key to the records of its subscribers. `notify` and the
//! size observers take the lock shared so concurrent publishers fan out in
//! parallel; `subscribe`/`unsubscribe` take it exclusive and are expected to
//! be much rarer.
//!
//! ## Record handles
//! Every record gets a unique, never-reused `u64` id; the
//! [`SubscriptionHandle`] returned by `subscribe` carries that id and is the
//! address used by `unsubscribe`. Erasing by an id that is already gone is a
//! no-op, which makes double-unsubscribe safe.
//!
//! ## Dead-record cleanup
//! `notify` snapshots the live records under the shared lock and collects
//! the ids whose weak reference no longer upgrades; once the shared lock is
//! released those ids are erased under a brief exclusive lock. Dispatching
//! after the lock is dropped also keeps recursive `notify` from a callback
//! (sync dispatcher) from re-entering a held lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::dispatch::{Dispatch, SetId, Tid};
use crate::subscription::subscriber::Sink;

/// Address of one subscription record inside an engine.
///
/// Single-use: after `unsubscribe` the id matches nothing, so using the
/// handle again is harmless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
}

/// One registry entry: where to deliver and whom to deliver to.
struct Record<K, P> {
    id: u64,
    tid: Tid,
    set_id: SetId,
    sink: Weak<dyn Sink<K, P>>,
}

/// Registry of subscribers for one `(K, P)` family.
///
/// `K` is the event-key enumeration, `P` the payload type carried by every
/// notification on this engine (a tuple when an event carries several
/// values). Payload shape mismatches are unrepresentable: an engine only
/// accepts the `P` it was created with.
pub struct SubscriptionEngine<K, P> {
    dispatcher: Arc<dyn Dispatch>,
    registry: RwLock<HashMap<K, Vec<Record<K, P>>>>,
    next_id: AtomicU64,
}

impl<K, P> SubscriptionEngine<K, P>
where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    P: Clone + Send + 'static,
{
    /// Creates an engine fanning out through `dispatcher`.
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            registry: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// The dispatcher this engine delivers through.
    pub fn dispatcher(&self) -> Arc<dyn Dispatch> {
        Arc::clone(&self.dispatcher)
    }

    /// Registers `sink` for `key`, delivering on lane `tid`.
    ///
    /// # Panics
    /// If `tid` is out of range for the dispatcher (programmer error).
    pub fn subscribe(
        &self,
        tid: Tid,
        set_id: SetId,
        key: K,
        sink: Weak<dyn Sink<K, P>>,
    ) -> SubscriptionHandle {
        self.dispatcher.check_tid(tid);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut registry = self.registry.write().unwrap();
        registry.entry(key).or_default().push(Record {
            id,
            tid,
            set_id,
            sink,
        });
        SubscriptionHandle { id }
    }

    /// Erases the record addressed by `handle` under `key`.
    ///
    /// A second call with the same handle is a no-op. The key's entry is
    /// removed once its last record goes.
    pub fn unsubscribe(&self, key: K, handle: SubscriptionHandle) {
        let mut registry = self.registry.write().unwrap();
        if let Some(records) = registry.get_mut(&key) {
            records.retain(|record| record.id != handle.id);
            if records.is_empty() {
                registry.remove(&key);
            }
        }
    }

    /// Number of records registered for `key`.
    pub fn size_of(&self, key: K) -> usize {
        let registry = self.registry.read().unwrap();
        registry.get(&key).map_or(0, Vec::len)
    }

    /// Total number of records across all keys.
    pub fn size(&self) -> usize {
        let registry = self.registry.read().unwrap();
        registry.values().map(Vec::len).sum()
    }

    /// Fans `payload` out to every live subscriber of `key`.
    ///
    /// With the pool dispatcher this returns after enqueueing; with the sync
    /// dispatcher the callbacks have completed on return. Each queued
    /// closure re-upgrades its weak reference on the lane, so a subscriber
    /// dropped while the delivery was queued is skipped silently.
    pub fn notify(&self, key: K, payload: P) {
        let mut live: Vec<(Tid, SetId, Weak<dyn Sink<K, P>>)> = Vec::new();
        let mut dead: Vec<u64> = Vec::new();
        {
            let registry = self.registry.read().unwrap();
            let Some(records) = registry.get(&key) else {
                return;
            };
            for record in records {
                if record.sink.upgrade().is_some() {
                    live.push((record.tid, record.set_id, Weak::clone(&record.sink)));
                } else {
                    dead.push(record.id);
                }
            }
        }

        for (tid, set_id, sink) in live {
            let payload = payload.clone();
            self.dispatcher.add(
                tid,
                Box::new(move || {
                    if let Some(subscriber) = sink.upgrade() {
                        subscriber.on_notify(set_id, key, payload);
                    }
                }),
            );
        }

        if !dead.is_empty() {
            let mut registry = self.registry.write().unwrap();
            if let Some(records) = registry.get_mut(&key) {
                records.retain(|record| !dead.contains(&record.id));
                if records.is_empty() {
                    registry.remove(&key);
                }
            }
        }
    }
}
