//! # lanebus
//!
//! **Lanebus** is the in-process, strongly-typed publish/subscribe runtime
//! the node's subsystems talk through: consensus, block application,
//! mempool, metrics and timers publish named events and subscribe to each
//! other's, receiving callbacks on dedicated worker lanes without holding
//! references to one another.
//!
//! ## Features
//!
//! | Area            | Description                                                      | Key types / traits                        |
//! |-----------------|------------------------------------------------------------------|-------------------------------------------|
//! | **Engines**     | Typed registries, one per `(event key, payload)` family.         | [`SubscriptionEngine`]                    |
//! | **Dispatch**    | Fixed pool of FIFO lanes; inline variant for deterministic tests.| [`Dispatch`], [`PoolDispatcher`], [`SyncDispatcher`] |
//! | **Subscribers** | User state plus a callback; weakly held, cleaned up on drop.     | [`Subscriber`], [`create_subscriber`]     |
//! | **Timers**      | Delayed delivery on any lane.                                    | [`Dispatch::add_delayed`]                 |
//! | **Lifecycle**   | Lazy engine creation, ordered teardown.                          | [`SubscriptionManager`], [`subscription`] |
//! | **Observability** | Per-lane counters and structured logs at the lane boundary.    | [`LaneStats`]                             |
//!
//! ## Example
//!
//! ```no_run
//! use lanebus::{create_subscriber, subscription, Lane, NodeEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = subscription();
//!
//!     // Metrics counts committed blocks; deliveries run on the metrics lane.
//!     let counter = create_subscriber(
//!         &manager,
//!         NodeEvent::Block,
//!         Lane::Metrics.tid(),
//!         0u64,
//!         |blocks: &mut u64, height: u64| {
//!             *blocks += 1;
//!             let _ = height;
//!         },
//!     );
//!
//!     // Somewhere in the block pipeline:
//!     manager.engine::<NodeEvent, u64>().notify(NodeEvent::Block, 42);
//!
//!     // Dropping `counter` ends the subscription; teardown at exit:
//!     drop(counter);
//!     manager.dispose().await;
//! }
//! ```
//!
//! ## Delivery model
//!
//! `notify` snapshots the live subscribers for the key and enqueues one
//! closure per subscriber on the lane chosen at subscribe time. Closures
//! hold weak references: a subscriber dropped while deliveries are still
//! queued is skipped silently, and its registry records are erased eagerly
//! by its destructor (or lazily by the next `notify` that walks them).
//! Within one lane tasks run in submission order; across lanes nothing is
//! ordered.
//!
//! ---

mod config;
mod dispatch;
mod error;
mod events;
mod subscription;

// ---- Public re-exports ----

pub use config::Config;
pub use dispatch::{
    Dispatch, LaneStats, LaneStatsSnapshot, LaneTask, PoolDispatcher, SetId, SyncDispatcher, Tid,
};
pub use error::DispatchError;
pub use events::{Lane, NodeEvent};
pub use subscription::{
    create_subscriber, subscription, Sink, Subscriber, SubscriptionEngine, SubscriptionHandle,
    SubscriptionManager,
};
