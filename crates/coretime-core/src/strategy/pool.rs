use super::{gate, OrderDecision, SkipReason};
use crate::state::OrderState;
use coretime_types::ChainSignal;

/// Orders when the parachain's pending extrinsic count reaches `max_transactions`.
///
/// With `initial_order` set, the first sample that passes the gate places an
/// order regardless of the count. This happens at most once per process.
#[derive(Debug, Clone)]
pub struct TransactionPoolStrategy {
	max_transactions: usize,
	initial_order_pending: bool,
}

impl TransactionPoolStrategy {
	pub fn new(max_transactions: usize, initial_order: bool) -> Self {
		Self {
			max_transactions,
			initial_order_pending: initial_order,
		}
	}

	pub fn evaluate(&mut self, signal: &ChainSignal, state: &mut OrderState) -> OrderDecision {
		let pending = match signal {
			ChainSignal::PoolSample { pending } => *pending,
			ChainSignal::FinalizedBlock { .. } => return OrderDecision::Skip(SkipReason::Ignored),
		};

		let threshold_met = self.initial_order_pending || pending >= self.max_transactions;
		let decision = gate(state, threshold_met);
		if decision == OrderDecision::Place {
			self.initial_order_pending = false;
		}
		decision
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample(pending: usize) -> ChainSignal {
		ChainSignal::PoolSample { pending }
	}

	#[test]
	fn test_places_only_past_threshold() {
		let mut strategy = TransactionPoolStrategy::new(50, false);
		let mut state = OrderState::new();

		let decisions: Vec<_> = [10, 30, 55]
			.into_iter()
			.map(|pending| strategy.evaluate(&sample(pending), &mut state))
			.collect();

		assert_eq!(
			decisions,
			vec![
				OrderDecision::Skip(SkipReason::BelowThreshold),
				OrderDecision::Skip(SkipReason::BelowThreshold),
				OrderDecision::Place,
			]
		);
	}

	#[test]
	fn test_threshold_is_inclusive() {
		let mut strategy = TransactionPoolStrategy::new(50, false);
		let mut state = OrderState::new();
		assert_eq!(strategy.evaluate(&sample(50), &mut state), OrderDecision::Place);
	}

	#[test]
	fn test_initial_order_fires_once() {
		let mut strategy = TransactionPoolStrategy::new(50, true);
		let mut state = OrderState::new();

		assert_eq!(strategy.evaluate(&sample(0), &mut state), OrderDecision::Place);
		state.begin().unwrap();
		state.complete();
		state.vacate();

		assert_eq!(
			strategy.evaluate(&sample(0), &mut state),
			OrderDecision::Skip(SkipReason::BelowThreshold)
		);
	}

	#[test]
	fn test_initial_order_respects_gate() {
		let mut strategy = TransactionPoolStrategy::new(50, true);
		let mut state = OrderState::new();
		state.begin().unwrap();

		assert_eq!(
			strategy.evaluate(&sample(0), &mut state),
			OrderDecision::Skip(SkipReason::OrderInFlight)
		);

		state.fail();
		state.vacate();
		// still owed, the gate blocked it
		assert_eq!(strategy.evaluate(&sample(0), &mut state), OrderDecision::Place);
	}

	#[test]
	fn test_finalized_blocks_ignored() {
		let mut strategy = TransactionPoolStrategy::new(1, true);
		let mut state = OrderState::new();
		assert_eq!(
			strategy.evaluate(&ChainSignal::FinalizedBlock { number: 7 }, &mut state),
			OrderDecision::Skip(SkipReason::Ignored)
		);
		assert_eq!(state.block_counter(), 0);
	}
}
