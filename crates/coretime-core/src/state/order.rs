//! Ordering state of one running watcher.
//!
//! Tracks how many finalized blocks passed since the last purchase, whether a
//! purchase is being submitted and whether the purchased core is still waiting
//! to be used. A purchase may only start when nothing is in flight and no core
//! is queued; starting one raises both flags at once.

use thiserror::Error;

/// Errors that can occur during order state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderStateError {
	#[error("Cannot start an order while one is in flight")]
	OrderInFlight,
	#[error("Cannot start an order while a core is queued")]
	CoreInQueue,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrderState {
	block_counter: u64,
	ordering: bool,
	core_in_queue: bool,
}

impl OrderState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn block_counter(&self) -> u64 {
		self.block_counter
	}

	pub fn is_ordering(&self) -> bool {
		self.ordering
	}

	pub fn is_core_in_queue(&self) -> bool {
		self.core_in_queue
	}

	/// True when neither a submission nor a queued core blocks a new order.
	pub fn can_order(&self) -> bool {
		!self.ordering && !self.core_in_queue
	}

	/// Counts one finalized relay chain block.
	pub fn record_block(&mut self) {
		self.block_counter = self.block_counter.saturating_add(1);
	}

	/// Marks a purchase as started.
	pub fn begin(&mut self) -> Result<(), OrderStateError> {
		if self.ordering {
			return Err(OrderStateError::OrderInFlight);
		}
		if self.core_in_queue {
			return Err(OrderStateError::CoreInQueue);
		}
		self.ordering = true;
		self.core_in_queue = true;
		Ok(())
	}

	/// The purchase was finalized on chain. The core stays queued.
	pub fn complete(&mut self) {
		self.block_counter = 0;
		self.ordering = false;
	}

	/// The purchase did not make it on chain. The block count is kept.
	pub fn fail(&mut self) {
		self.ordering = false;
	}

	/// The purchased core has been used.
	pub fn vacate(&mut self) {
		self.core_in_queue = false;
	}
}
