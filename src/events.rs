//! # The node's event set and lane assignments.
//!
//! [`NodeEvent`] is the closed enumeration of events the node's subsystems
//! publish to each other; [`Lane`] names the worker lanes those deliveries
//! run on. Both are ordinary values for the generic machinery: an engine is
//! keyed by `NodeEvent` the same way a test engine is keyed by its own
//! enum.
//!
//! Events with different payload shapes live on different engines, so the
//! variants here deliberately say nothing about payloads: the publisher
//! and its subscribers agree on the payload type by requesting the same
//! `(NodeEvent, P)` engine from the manager.

use crate::dispatch::Tid;

/// Events exchanged between the node's subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEvent {
    // === Consensus rounds ===
    /// A consensus round produced an outcome.
    Outcome,
    /// An outcome arrived from the consensus engine itself.
    ConsensusOutcome,
    /// An outcome was rescheduled for a later round.
    OutcomeDelayed,
    /// The peer list for the current round changed.
    CurrentRoundPeers,
    /// The node moved to a new round.
    RoundSwitch,
    /// Hashes for the round were fully processed.
    ProcessedHashes,

    // === Synchronization ===
    /// The node caught up with the network.
    Synchronization,
    /// First synchronization after startup completed.
    InitialSynchronization,

    // === Proposal pipeline ===
    /// A proposal arrived from the ordering service.
    Proposal,
    /// A proposal passed stateless verification.
    VerifiedProposal,
    /// Consensus asked for a proposal for the next round.
    NeedProposal,
    /// A freshly packed proposal is ready.
    NewProposal,

    // === Block pipeline ===
    /// A block was committed.
    Block,
    /// The first block after startup was committed.
    InitialBlock,
    /// The block creator produced an event (new block or none this round).
    BlockCreatorEvent,
    /// Transactions were finalized by a committed block.
    FinalizedTxs,
    /// World state was advanced to a new height.
    ApplyState,

    // === Multisignature transactions ===
    /// The shared transaction state was updated.
    StateUpdate,
    /// Batches gathered all required signatures.
    PreparedBatches,
    /// Batches expired before gathering signatures.
    ExpiredBatches,

    // === Timers ===
    /// A delayed self-notification fired.
    Timer,
}

/// Worker lanes of the node's dispatcher pool.
///
/// `subscribe` pins a subscription to one of these; everything delivered to
/// a lane runs in FIFO order on that lane's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Lane {
    /// Consensus voting and outcome processing.
    Consensus = 0,
    /// Metrics collection.
    Metrics,
    /// Proposal requests and packing.
    Proposals,
    /// Vote verification.
    Votes,
}

impl Lane {
    /// Number of lanes; the default pool size in [`Config`](crate::Config).
    pub const COUNT: u32 = 4;

    /// The tid this lane maps to.
    pub const fn tid(self) -> Tid {
        self as Tid
    }
}
