//! Event types delivered to the order controller.
//!
//! Every signal source, the queue monitor and the submission task talk to the
//! controller through a single channel of `WatcherEvent`s. The controller
//! consumes them serially, in arrival order.

use crate::TxHash;
use serde::{Deserialize, Serialize};

/// Main event type consumed by the control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatcherEvent {
	/// Raw chain or pool signals fed to the ordering strategy.
	Signal(ChainSignal),
	/// Occupancy transitions of the parachain's on-demand core.
	Queue(QueueEvent),
	/// Terminal outcome of a purchase submission.
	Submission(SubmissionEvent),
}

/// Signals the ordering strategy reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainSignal {
	/// A relay chain block has been finalized.
	FinalizedBlock { number: u64 },
	/// The parachain's transaction pool has been sampled.
	PoolSample { pending: usize },
}

/// Transitions reported by the queue monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueEvent {
	/// A core has been allocated to the parachain.
	Occupied { core_index: u32 },
	/// The previously allocated core is no longer in use.
	Vacated,
}

/// Terminal outcome of one purchase submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionEvent {
	/// The order extrinsic was finalized and dispatched successfully.
	Finalized { order_id: u64, tx_hash: TxHash },
	/// The order was rejected, dropped, failed at dispatch or lost.
	Failed { order_id: u64, reason: String },
}

impl SubmissionEvent {
	/// Returns the id of the order this outcome belongs to.
	pub fn order_id(&self) -> u64 {
		match self {
			SubmissionEvent::Finalized { order_id, .. } => *order_id,
			SubmissionEvent::Failed { order_id, .. } => *order_id,
		}
	}
}

impl From<ChainSignal> for WatcherEvent {
	fn from(signal: ChainSignal) -> Self {
		WatcherEvent::Signal(signal)
	}
}

impl From<QueueEvent> for WatcherEvent {
	fn from(event: QueueEvent) -> Self {
		WatcherEvent::Queue(event)
	}
}

impl From<SubmissionEvent> for WatcherEvent {
	fn from(event: SubmissionEvent) -> Self {
		WatcherEvent::Submission(event)
	}
}
