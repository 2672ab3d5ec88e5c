//! Ordering strategies.
//!
//! A strategy looks at one chain signal and the current `OrderState` and
//! decides whether a purchase is due. It never submits anything itself.

pub mod block;
pub mod pool;

pub use block::BlockCountStrategy;
pub use pool::TransactionPoolStrategy;

use crate::state::OrderState;
use coretime_config::Config;
use coretime_types::{ChainSignal, OrderingMode};
use std::fmt;

/// Outcome of evaluating a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDecision {
	Place,
	Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// The strategy does not react to this kind of signal.
	Ignored,
	BelowThreshold,
	OrderInFlight,
	CoreInQueue,
}

impl fmt::Display for SkipReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let reason = match self {
			SkipReason::Ignored => "signal ignored",
			SkipReason::BelowThreshold => "below threshold",
			SkipReason::OrderInFlight => "order in flight",
			SkipReason::CoreInQueue => "core in queue",
		};
		f.write_str(reason)
	}
}

/// Applies the single-flight gate to a threshold decision.
pub(crate) fn gate(state: &OrderState, threshold_met: bool) -> OrderDecision {
	if !threshold_met {
		OrderDecision::Skip(SkipReason::BelowThreshold)
	} else if state.is_ordering() {
		OrderDecision::Skip(SkipReason::OrderInFlight)
	} else if state.is_core_in_queue() {
		OrderDecision::Skip(SkipReason::CoreInQueue)
	} else {
		OrderDecision::Place
	}
}

/// Strategy selected by the ordering mode.
#[derive(Debug, Clone)]
pub enum OrderingStrategy {
	BlockCount(BlockCountStrategy),
	TransactionPool(TransactionPoolStrategy),
}

impl OrderingStrategy {
	pub fn from_config(mode: OrderingMode, config: &Config) -> Self {
		match mode {
			OrderingMode::Block => {
				OrderingStrategy::BlockCount(BlockCountStrategy::new(config.max_blocks))
			}
			OrderingMode::TransactionPool => OrderingStrategy::TransactionPool(
				TransactionPoolStrategy::new(config.max_transactions, config.initial_order),
			),
		}
	}

	pub fn mode(&self) -> OrderingMode {
		match self {
			OrderingStrategy::BlockCount(_) => OrderingMode::Block,
			OrderingStrategy::TransactionPool(_) => OrderingMode::TransactionPool,
		}
	}

	pub fn evaluate(&mut self, signal: &ChainSignal, state: &mut OrderState) -> OrderDecision {
		match self {
			OrderingStrategy::BlockCount(strategy) => strategy.evaluate(signal, state),
			OrderingStrategy::TransactionPool(strategy) => strategy.evaluate(signal, state),
		}
	}
}
