//! Parachain transaction pool sampler used by the transaction-pool strategy.

use super::{wait_retry, TaskHandle};
use crate::{reconnect_backoff, ChainInterface, MonitorError, MonitorInterface};
use async_trait::async_trait;
use backoff::backoff::Backoff;
use coretime_types::{ChainSignal, WatcherEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Emits `ChainSignal::PoolSample` with the parachain's pending extrinsic
/// count every `check_interval`.
pub struct PoolSampler {
	chain: Arc<dyn ChainInterface>,
	para_id: u32,
	check_interval: Duration,
	handle: TaskHandle,
}

impl PoolSampler {
	pub fn new(chain: Arc<dyn ChainInterface>, para_id: u32, check_interval: Duration) -> Self {
		Self {
			chain,
			para_id,
			check_interval,
			handle: TaskHandle::new(),
		}
	}

	/// Sampling loop. A failed sample waits out the reconnect backoff, then
	/// reconnects and restarts the interval.
	async fn sampling_loop(
		chain: Arc<dyn ChainInterface>,
		para_id: u32,
		check_interval: Duration,
		sender: mpsc::UnboundedSender<WatcherEvent>,
		mut stop_rx: mpsc::Receiver<()>,
	) {
		let mut backoff = reconnect_backoff();
		let mut interval = tokio::time::interval(check_interval);
		// Set the interval to skip missed ticks instead of bursting
		interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			let (generation, sample) = tokio::select! {
				_ = interval.tick() => {
					let generation = chain.connection_generation();
					(generation, chain.pending_transaction_count().await)
				}
				_ = stop_rx.recv() => {
					break;
				}
			};

			match sample {
				Ok(pending) => {
					backoff.reset();
					tracing::trace!(parachain_id = para_id, pending, "Pool sampled");
					if sender.send(ChainSignal::PoolSample { pending }.into()).is_err() {
						break;
					}
				}
				Err(e) => {
					tracing::warn!(
						parachain_id = para_id,
						phase = "pool_sample",
						error = %e,
						"Failed to read pending extrinsics"
					);
					if !wait_retry(&mut backoff, &mut stop_rx).await {
						break;
					}
					if let Err(e) = chain.reconnect(generation).await {
						tracing::warn!(parachain_id = para_id, phase = "pool_sample", error = %e, "Reconnect failed");
					}
					interval.reset();
				}
			}
		}
	}
}

#[async_trait]
impl MonitorInterface for PoolSampler {
	fn name(&self) -> &'static str {
		"pool_sample"
	}

	async fn start_monitoring(
		&self,
		sender: mpsc::UnboundedSender<WatcherEvent>,
	) -> Result<(), MonitorError> {
		let chain = self.chain.clone();
		let para_id = self.para_id;
		let check_interval = self.check_interval;

		self.handle
			.start(move |stop_rx| {
				Self::sampling_loop(chain, para_id, check_interval, sender, stop_rx)
			})
			.await
	}

	async fn stop_monitoring(&self) -> Result<(), MonitorError> {
		self.handle.stop().await;
		Ok(())
	}
}
