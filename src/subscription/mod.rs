//! # Typed subscription registries.
//!
//! One [`SubscriptionEngine`] per `(event key, payload)` type pair holds the
//! registry of weak subscriber references; the [`SubscriptionManager`]
//! memoizes engines and owns the dispatcher they fan out through.
//!
//! ## Data flow
//! ```text
//! publisher ── engine.notify(key, payload)
//!                  │ snapshot live records under the shared lock
//!                  ▼
//!            dispatcher.add(record.tid, closure)
//!                  │ closure re-upgrades the weak reference on the lane
//!                  ▼
//!            subscriber.on_notify(set_id, key, payload)
//! ```
//!
//! ## Lifetime rules
//! - The application holds the only strong references to subscribers;
//!   engines and queued closures hold weak ones
//! - Dropping the last strong reference unregisters the subscriber (eager)
//!   and turns any still-queued deliveries into no-ops
//! - Records whose weak reference is found dead during `notify` are erased
//!   lazily right after the snapshot

mod engine;
mod manager;
mod subscriber;

pub use engine::{SubscriptionEngine, SubscriptionHandle};
pub use manager::{subscription, SubscriptionManager};
pub use subscriber::{create_subscriber, Sink, Subscriber};
