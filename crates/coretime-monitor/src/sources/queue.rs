//! Queue monitor: tracks whether the parachain still holds an on-demand core.
//!
//! The relay chain records the core assigned to a parachain's on-demand order
//! in `OnDemand::ParaIdAffinity`. The entry disappears once the core has been
//! used, which is the signal that a new order may be placed.

use super::{supervise, TaskHandle};
use crate::{ChainInterface, MonitorError, MonitorInterface};
use async_trait::async_trait;
use coretime_types::{QueueEvent, WatcherEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Turns a sequence of affinity values into occupancy transitions.
#[derive(Debug, Default)]
pub struct AffinityTracker {
	last: Option<u32>,
}

impl AffinityTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a value and returns the transition it causes, if any.
	pub fn observe(&mut self, current: Option<u32>) -> Option<QueueEvent> {
		let previous = std::mem::replace(&mut self.last, current);
		match (previous, current) {
			(Some(_), None) => Some(QueueEvent::Vacated),
			(None, Some(core_index)) => Some(QueueEvent::Occupied { core_index }),
			_ => None,
		}
	}
}

/// Emits `QueueEvent`s for the parachain's on-demand core.
pub struct QueueMonitor {
	chain: Arc<dyn ChainInterface>,
	para_id: u32,
	handle: TaskHandle,
}

impl QueueMonitor {
	pub fn new(chain: Arc<dyn ChainInterface>, para_id: u32) -> Self {
		Self {
			chain,
			para_id,
			handle: TaskHandle::new(),
		}
	}
}

#[async_trait]
impl MonitorInterface for QueueMonitor {
	fn name(&self) -> &'static str {
		"core_affinity"
	}

	async fn start_monitoring(
		&self,
		sender: mpsc::UnboundedSender<WatcherEvent>,
	) -> Result<(), MonitorError> {
		let chain = self.chain.clone();
		let para_id = self.para_id;

		self.handle
			.start(move |stop_rx| async move {
				// lives across resubscriptions
				let mut tracker = AffinityTracker::new();
				supervise(
					"core_affinity",
					para_id,
					chain,
					move |chain| async move { chain.core_affinity(para_id).await },
					move |affinity| match tracker.observe(affinity) {
						Some(event) => {
							tracing::debug!(parachain_id = para_id, ?event, "Core affinity changed");
							sender.send(event.into()).is_ok()
						}
						None => true,
					},
					stop_rx,
				)
				.await;
				tracing::debug!(parachain_id = para_id, "Queue monitor stopped");
			})
			.await
	}

	async fn stop_monitoring(&self) -> Result<(), MonitorError> {
		self.handle.stop().await;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sources::testing::FakeChain;

	#[test]
	fn test_tracker_transitions() {
		let mut tracker = AffinityTracker::new();
		assert_eq!(tracker.observe(None), None);
		assert_eq!(
			tracker.observe(Some(2)),
			Some(QueueEvent::Occupied { core_index: 2 })
		);
		assert_eq!(tracker.observe(Some(2)), None);
		// moving to another core is not a vacancy
		assert_eq!(tracker.observe(Some(5)), None);
		assert_eq!(tracker.observe(None), Some(QueueEvent::Vacated));
		assert_eq!(tracker.observe(None), None);
	}

	#[tokio::test(start_paused = true)]
	async fn test_emits_only_transitions() {
		let chain = Arc::new(FakeChain::with_affinity(vec![vec![
			Ok(None),
			Ok(Some(2)),
			Ok(Some(2)),
			Ok(None),
		]]));
		let monitor = QueueMonitor::new(chain, 2000);
		let (tx, mut rx) = mpsc::unbounded_channel();

		monitor.start_monitoring(tx).await.unwrap();

		assert_eq!(
			rx.recv().await,
			Some(QueueEvent::Occupied { core_index: 2 }.into())
		);
		assert_eq!(rx.recv().await, Some(QueueEvent::Vacated.into()));

		monitor.stop_monitoring().await.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn test_last_value_survives_reconnect() {
		let chain = Arc::new(FakeChain::with_affinity(vec![
			vec![Ok(Some(1))],
			// a fresh subscription starts by reporting the current value
			vec![Ok(None)],
		]));
		let monitor = QueueMonitor::new(chain, 2000);
		let (tx, mut rx) = mpsc::unbounded_channel();

		monitor.start_monitoring(tx).await.unwrap();

		assert_eq!(
			rx.recv().await,
			Some(QueueEvent::Occupied { core_index: 1 }.into())
		);
		assert_eq!(rx.recv().await, Some(QueueEvent::Vacated.into()));

		monitor.stop_monitoring().await.unwrap();
	}
}
