use super::{gate, OrderDecision, SkipReason};
use crate::state::OrderState;
use coretime_types::ChainSignal;

/// Orders once `max_blocks` relay chain blocks were finalized since the last
/// successful purchase.
#[derive(Debug, Clone)]
pub struct BlockCountStrategy {
	max_blocks: u64,
}

impl BlockCountStrategy {
	pub fn new(max_blocks: u64) -> Self {
		Self { max_blocks }
	}

	/// Every finalized block is counted, including those seen while an order
	/// is in flight.
	pub fn evaluate(&mut self, signal: &ChainSignal, state: &mut OrderState) -> OrderDecision {
		match signal {
			ChainSignal::FinalizedBlock { .. } => {
				state.record_block();
				gate(state, state.block_counter() >= self.max_blocks)
			}
			ChainSignal::PoolSample { .. } => OrderDecision::Skip(SkipReason::Ignored),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn block(number: u64) -> ChainSignal {
		ChainSignal::FinalizedBlock { number }
	}

	#[test]
	fn test_places_on_tenth_block() {
		let mut strategy = BlockCountStrategy::new(10);
		let mut state = OrderState::new();

		for n in 1..10 {
			assert_eq!(
				strategy.evaluate(&block(n), &mut state),
				OrderDecision::Skip(SkipReason::BelowThreshold)
			);
		}
		assert_eq!(strategy.evaluate(&block(10), &mut state), OrderDecision::Place);
		assert_eq!(state.block_counter(), 10);
	}

	#[test]
	fn test_counts_while_ordering() {
		let mut strategy = BlockCountStrategy::new(2);
		let mut state = OrderState::new();
		state.begin().unwrap();

		for n in 1..=5 {
			assert_eq!(
				strategy.evaluate(&block(n), &mut state),
				OrderDecision::Skip(SkipReason::OrderInFlight)
			);
		}
		assert_eq!(state.block_counter(), 5);
	}

	#[test]
	fn test_pool_samples_ignored() {
		let mut strategy = BlockCountStrategy::new(1);
		let mut state = OrderState::new();
		assert_eq!(
			strategy.evaluate(&ChainSignal::PoolSample { pending: 1000 }, &mut state),
			OrderDecision::Skip(SkipReason::Ignored)
		);
		assert_eq!(state.block_counter(), 0);
	}
}
