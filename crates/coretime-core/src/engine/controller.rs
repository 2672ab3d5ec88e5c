//! Order controller: the decision function of the control loop.
//!
//! The controller owns the `OrderState` and the strategy. It consumes one
//! `WatcherEvent` at a time and answers with the effect the engine has to
//! carry out, if any. It performs no I/O, so every scenario can be replayed
//! in a unit test by feeding events and timestamps.

use crate::state::OrderState;
use crate::strategy::{OrderDecision, OrderingStrategy};
use coretime_types::{
	display_planck, truncate_id, ChainSignal, CoretimeOrder, QueueEvent, SubmissionEvent,
	WatcherEvent,
};
use std::time::Duration;
use tokio::time::Instant;

/// Work the engine has to perform after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
	/// Submit this order and report its outcome back as a `SubmissionEvent`.
	PlaceOrder(CoretimeOrder),
}

/// Orders retired by the watchdog.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatchdogReport {
	/// Id of the submission abandoned because it ran too long.
	pub abandoned_order: Option<u64>,
	/// True if a queued core was released without a vacancy signal.
	pub released_core: bool,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
	order_id: u64,
	since: Instant,
}

pub struct OrderController {
	strategy: OrderingStrategy,
	state: OrderState,
	para_id: u32,
	max_amount: u128,
	watchdog_timeout: Option<Duration>,
	next_order_id: u64,
	in_flight: Option<InFlight>,
	queued_since: Option<Instant>,
}

impl OrderController {
	pub fn new(
		strategy: OrderingStrategy,
		para_id: u32,
		max_amount: u128,
		watchdog_timeout: Option<Duration>,
	) -> Self {
		Self {
			strategy,
			state: OrderState::new(),
			para_id,
			max_amount,
			watchdog_timeout,
			next_order_id: 1,
			in_flight: None,
			queued_since: None,
		}
	}

	pub fn state(&self) -> &OrderState {
		&self.state
	}

	pub fn para_id(&self) -> u32 {
		self.para_id
	}

	pub fn watchdog_timeout(&self) -> Option<Duration> {
		self.watchdog_timeout
	}

	/// Id of the submission currently in flight.
	pub fn in_flight_order(&self) -> Option<u64> {
		self.in_flight.map(|f| f.order_id)
	}

	/// Applies one event and returns the effect to carry out.
	pub fn handle(&mut self, event: WatcherEvent, now: Instant) -> Option<Effect> {
		match event {
			WatcherEvent::Signal(signal) => self.on_signal(signal, now),
			WatcherEvent::Queue(event) => {
				self.on_queue(event);
				None
			}
			WatcherEvent::Submission(outcome) => {
				self.on_outcome(outcome);
				None
			}
		}
	}

	fn on_signal(&mut self, signal: ChainSignal, now: Instant) -> Option<Effect> {
		match self.strategy.evaluate(&signal, &mut self.state) {
			OrderDecision::Place => {}
			OrderDecision::Skip(reason) => {
				tracing::trace!(?signal, %reason, "No order");
				return None;
			}
		}

		if let Err(e) = self.state.begin() {
			// unreachable while strategies apply the gate
			tracing::error!(parachain_id = self.para_id, error = %e, "Order decision rejected");
			return None;
		}

		let order = CoretimeOrder {
			id: self.next_order_id,
			para_id: self.para_id,
			max_amount: self.max_amount,
		};
		self.next_order_id += 1;
		self.in_flight = Some(InFlight {
			order_id: order.id,
			since: now,
		});
		self.queued_since = Some(now);

		tracing::info!(
			parachain_id = self.para_id,
			order_id = order.id,
			mode = %self.strategy.mode(),
			block_counter = self.state.block_counter(),
			max_amount = %display_planck(order.max_amount),
			"Ordering on-demand coretime"
		);
		Some(Effect::PlaceOrder(order))
	}

	fn on_queue(&mut self, event: QueueEvent) {
		match event {
			QueueEvent::Occupied { core_index } => {
				tracing::info!(parachain_id = self.para_id, core_index, "Core assigned");
			}
			QueueEvent::Vacated => {
				self.state.vacate();
				self.queued_since = None;
				tracing::info!(parachain_id = self.para_id, "Core vacated, ordering unblocked");
			}
		}
	}

	fn on_outcome(&mut self, outcome: SubmissionEvent) {
		let current = self.in_flight_order();
		if current != Some(outcome.order_id()) {
			tracing::warn!(
				parachain_id = self.para_id,
				order_id = outcome.order_id(),
				in_flight = ?current,
				"Ignoring outcome of an abandoned order"
			);
			return;
		}
		self.in_flight = None;

		match outcome {
			SubmissionEvent::Finalized { order_id, tx_hash } => {
				self.state.complete();
				tracing::info!(
					parachain_id = self.para_id,
					order_id,
					tx_hash = %truncate_id(&tx_hash.to_string()),
					"Coretime order finalized"
				);
			}
			SubmissionEvent::Failed { order_id, reason } => {
				self.state.fail();
				tracing::error!(
					parachain_id = self.para_id,
					order_id,
					phase = "submission",
					%reason,
					"Coretime order failed"
				);
			}
		}
	}

	/// Force-clears flags held longer than the watchdog timeout.
	pub fn check_watchdog(&mut self, now: Instant) -> WatchdogReport {
		let mut report = WatchdogReport::default();
		let Some(timeout) = self.watchdog_timeout else {
			return report;
		};

		if let Some(in_flight) = self.in_flight {
			if now.saturating_duration_since(in_flight.since) >= timeout {
				self.in_flight = None;
				self.state.fail();
				report.abandoned_order = Some(in_flight.order_id);
				tracing::warn!(
					parachain_id = self.para_id,
					order_id = in_flight.order_id,
					phase = "submission",
					timeout_secs = timeout.as_secs(),
					"Order submission timed out, abandoning it"
				);
			}
		}

		if let Some(since) = self.queued_since {
			if self.state.is_core_in_queue() && now.saturating_duration_since(since) >= timeout {
				self.queued_since = None;
				self.state.vacate();
				report.released_core = true;
				tracing::warn!(
					parachain_id = self.para_id,
					phase = "queue",
					timeout_secs = timeout.as_secs(),
					"No vacancy signal within timeout, releasing queued core"
				);
			}
		}

		report
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::strategy::{BlockCountStrategy, TransactionPoolStrategy};
	use coretime_types::TxHash;

	const PARA: u32 = 2000;

	fn block_controller(max_blocks: u64) -> OrderController {
		OrderController::new(
			OrderingStrategy::BlockCount(BlockCountStrategy::new(max_blocks)),
			PARA,
			1_000_000_000,
			Some(Duration::from_secs(600)),
		)
	}

	fn block(number: u64) -> WatcherEvent {
		ChainSignal::FinalizedBlock { number }.into()
	}

	fn finalized(order_id: u64) -> WatcherEvent {
		SubmissionEvent::Finalized {
			order_id,
			tx_hash: "0xabc".parse::<TxHash>().unwrap(),
		}
		.into()
	}

	fn failed(order_id: u64, reason: &str) -> WatcherEvent {
		SubmissionEvent::Failed {
			order_id,
			reason: reason.to_string(),
		}
		.into()
	}

	fn placed(effects: &[Option<Effect>]) -> Vec<u64> {
		effects
			.iter()
			.flatten()
			.map(|Effect::PlaceOrder(order)| order.id)
			.collect()
	}

	#[test]
	fn test_single_order_after_max_blocks() {
		let mut controller = block_controller(10);
		let now = Instant::now();

		let effects: Vec<_> = (1..=10).map(|n| controller.handle(block(n), now)).collect();

		assert_eq!(placed(&effects), vec![1]);
		assert_eq!(
			effects[9],
			Some(Effect::PlaceOrder(CoretimeOrder {
				id: 1,
				para_id: PARA,
				max_amount: 1_000_000_000,
			}))
		);
		assert!(controller.state().is_ordering());
		assert!(controller.state().is_core_in_queue());
	}

	#[test]
	fn test_finalized_resets_counter_keeps_queue() {
		let mut controller = block_controller(10);
		let now = Instant::now();
		for n in 1..=10 {
			controller.handle(block(n), now);
		}

		assert_eq!(controller.handle(finalized(1), now), None);

		assert_eq!(controller.state().block_counter(), 0);
		assert!(!controller.state().is_ordering());
		assert!(controller.state().is_core_in_queue());
	}

	#[test]
	fn test_no_second_order_while_ordering() {
		let mut controller = block_controller(1);
		let now = Instant::now();

		assert!(controller.handle(block(1), now).is_some());
		controller.handle(QueueEvent::Vacated.into(), now);
		// ordering is still true even though the queue flag cleared
		assert_eq!(controller.handle(block(2), now), None);
		assert_eq!(controller.in_flight_order(), Some(1));
	}

	#[test]
	fn test_failure_keeps_counter_and_retriggers() {
		let mut controller = block_controller(3);
		let now = Instant::now();
		for n in 1..=3 {
			controller.handle(block(n), now);
		}

		controller.handle(failed(1, "InsufficientFunds"), now);
		assert!(!controller.state().is_ordering());
		assert_eq!(controller.state().block_counter(), 3);

		// the queue flag set at initiation still blocks until vacancy
		assert_eq!(controller.handle(block(4), now), None);
		controller.handle(QueueEvent::Vacated.into(), now);

		let effect = controller.handle(block(5), now);
		assert!(matches!(effect, Some(Effect::PlaceOrder(CoretimeOrder { id: 2, .. }))));
	}

	#[test]
	fn test_pool_mode_orders_on_threshold() {
		let mut controller = OrderController::new(
			OrderingStrategy::TransactionPool(TransactionPoolStrategy::new(50, false)),
			PARA,
			5,
			None,
		);
		let now = Instant::now();

		let effects: Vec<_> = [10, 30, 55]
			.into_iter()
			.map(|pending| controller.handle(ChainSignal::PoolSample { pending }.into(), now))
			.collect();

		assert_eq!(effects[0], None);
		assert_eq!(effects[1], None);
		assert!(effects[2].is_some());
	}

	#[test]
	fn test_occupied_is_informational() {
		let mut controller = block_controller(10);
		let before = controller.state().clone();
		controller.handle(QueueEvent::Occupied { core_index: 4 }.into(), Instant::now());
		assert_eq!(controller.state(), &before);
	}

	#[test]
	fn test_stale_outcome_ignored() {
		let mut controller = block_controller(1);
		let start = Instant::now();
		controller.handle(block(1), start);

		let report = controller.check_watchdog(start + Duration::from_secs(601));
		assert_eq!(report.abandoned_order, Some(1));
		assert!(report.released_core);

		let later = start + Duration::from_secs(602);
		assert!(matches!(
			controller.handle(block(2), later),
			Some(Effect::PlaceOrder(CoretimeOrder { id: 2, .. }))
		));

		// late success of the abandoned order must not clear the new one
		controller.handle(finalized(1), later);
		assert!(controller.state().is_ordering());
		assert_eq!(controller.in_flight_order(), Some(2));
		assert_eq!(controller.state().block_counter(), 2);
	}

	#[test]
	fn test_watchdog_waits_for_timeout() {
		let mut controller = block_controller(1);
		let start = Instant::now();
		controller.handle(block(1), start);

		let report = controller.check_watchdog(start + Duration::from_secs(599));
		assert_eq!(report, WatchdogReport::default());
		assert!(controller.state().is_ordering());
	}

	#[test]
	fn test_watchdog_releases_queue_after_success() {
		let mut controller = block_controller(1);
		let start = Instant::now();
		controller.handle(block(1), start);
		controller.handle(finalized(1), start + Duration::from_secs(30));

		let report = controller.check_watchdog(start + Duration::from_secs(600));
		assert_eq!(report.abandoned_order, None);
		assert!(report.released_core);
		assert!(controller.state().can_order());
	}

	#[test]
	fn test_watchdog_disabled() {
		let mut controller = OrderController::new(
			OrderingStrategy::BlockCount(BlockCountStrategy::new(1)),
			PARA,
			5,
			None,
		);
		let start = Instant::now();
		controller.handle(block(1), start);

		let report = controller.check_watchdog(start + Duration::from_secs(86_400));
		assert_eq!(report, WatchdogReport::default());
		assert!(controller.state().is_ordering());
	}

	#[test]
	fn test_at_most_one_submission_for_any_interleaving() {
		let mut controller = block_controller(2);
		let now = Instant::now();
		let mut pending: Option<u64> = None;

		for n in 1..=60u64 {
			if let Some(Effect::PlaceOrder(order)) = controller.handle(block(n), now) {
				assert!(pending.is_none(), "second submission started");
				pending = Some(order.id);
			}

			// outcomes and vacancies arrive at unrelated points in the block stream
			if n % 5 == 0 {
				if let Some(id) = pending.take() {
					let outcome = if id % 2 == 0 {
						finalized(id)
					} else {
						failed(id, "Dropped")
					};
					controller.handle(outcome, now);
				}
			}
			if n % 7 == 0 {
				controller.handle(QueueEvent::Vacated.into(), now);
			}

			assert_eq!(controller.in_flight_order(), pending);
			assert_eq!(controller.state().is_ordering(), pending.is_some());
		}
	}
}
