//! Control loop of the watcher.
//!
//! The engine owns the controller and consumes every `WatcherEvent` on a
//! single task. Sources and submission tasks only send events; the order
//! state is never touched anywhere else.

pub mod controller;

use crate::strategy::OrderingStrategy;
use crate::submitter::OrderSubmitter;
use controller::{Effect, OrderController};
use coretime_config::Config;
use coretime_delivery::DeliveryService;
use coretime_monitor::MonitorService;
use coretime_types::OrderingMode;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Longest pause between two watchdog checks.
const MAX_WATCHDOG_PERIOD: Duration = Duration::from_secs(30);

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Service error: {0}")]
	Service(String),
}

pub struct CoretimeEngine {
	controller: OrderController,
	monitor: MonitorService,
	submitter: OrderSubmitter,
}

impl CoretimeEngine {
	pub fn new(controller: OrderController, monitor: MonitorService, submitter: OrderSubmitter) -> Self {
		Self {
			controller,
			monitor,
			submitter,
		}
	}

	/// Builds the engine for an ordering mode from the loaded configuration.
	pub fn from_config(
		config: &Config,
		mode: OrderingMode,
		monitor: MonitorService,
		delivery: Arc<DeliveryService>,
	) -> Self {
		let controller = OrderController::new(
			OrderingStrategy::from_config(mode, config),
			config.parachain_id,
			config.max_amount,
			config.watchdog_timeout(),
		);
		Self::new(controller, monitor, OrderSubmitter::new(delivery))
	}

	/// Runs until Ctrl-C.
	pub async fn run(self) -> Result<(), EngineError> {
		self.run_until(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "Cannot listen for shutdown signal");
				std::future::pending::<()>().await;
			}
		})
		.await
	}

	/// Runs until `shutdown` completes.
	///
	/// On shutdown every source is stopped and an in-flight submission is
	/// aborted without waiting for its outcome.
	pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), EngineError>
	where
		F: Future<Output = ()>,
	{
		let (event_tx, mut event_rx) = mpsc::unbounded_channel();
		self.monitor
			.start_all(event_tx.clone())
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;

		let period = self
			.controller
			.watchdog_timeout()
			.map_or(MAX_WATCHDOG_PERIOD, |timeout| timeout.min(MAX_WATCHDOG_PERIOD));
		let mut watchdog = tokio::time::interval_at(Instant::now() + period, period);
		watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

		let mut submission: Option<JoinHandle<()>> = None;
		tokio::pin!(shutdown);

		tracing::info!(
			parachain_id = self.controller.para_id(),
			"Watching for coretime demand"
		);

		loop {
			tokio::select! {
				Some(event) = event_rx.recv() => {
					if let Some(Effect::PlaceOrder(order)) = self.controller.handle(event, Instant::now()) {
						submission = Some(self.submitter.spawn(order, event_tx.clone()));
					}
				}
				_ = watchdog.tick() => {
					let report = self.controller.check_watchdog(Instant::now());
					if report.abandoned_order.is_some() {
						if let Some(handle) = submission.take() {
							handle.abort();
						}
					}
				}
				_ = &mut shutdown => {
					tracing::info!("Shutdown requested");
					break;
				}
			}
		}

		if let Some(handle) = submission.take() {
			handle.abort();
		}
		if let Err(e) = self.monitor.stop_all().await {
			tracing::warn!(error = %e, "Failed to stop sources cleanly");
		}

		tracing::info!(
			block_counter = self.controller.state().block_counter(),
			ordering = self.controller.state().is_ordering(),
			core_in_queue = self.controller.state().is_core_in_queue(),
			"Engine stopped"
		);
		Ok(())
	}
}
