//! Relay chain finalized block source used by the block-count strategy.

use super::{supervise, TaskHandle};
use crate::{ChainInterface, MonitorError, MonitorInterface};
use async_trait::async_trait;
use coretime_types::{ChainSignal, WatcherEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Emits `ChainSignal::FinalizedBlock` for every relay chain block finalized.
pub struct FinalizedBlockSource {
	chain: Arc<dyn ChainInterface>,
	para_id: u32,
	handle: TaskHandle,
}

impl FinalizedBlockSource {
	pub fn new(chain: Arc<dyn ChainInterface>, para_id: u32) -> Self {
		Self {
			chain,
			para_id,
			handle: TaskHandle::new(),
		}
	}
}

#[async_trait]
impl MonitorInterface for FinalizedBlockSource {
	fn name(&self) -> &'static str {
		"finalized_blocks"
	}

	async fn start_monitoring(
		&self,
		sender: mpsc::UnboundedSender<WatcherEvent>,
	) -> Result<(), MonitorError> {
		let chain = self.chain.clone();
		let para_id = self.para_id;

		self.handle
			.start(move |stop_rx| async move {
				supervise(
					"finalized_blocks",
					para_id,
					chain,
					|chain| async move { chain.finalized_blocks().await },
					move |number| {
						tracing::trace!(block = number, "Finalized block");
						sender
							.send(ChainSignal::FinalizedBlock { number }.into())
							.is_ok()
					},
					stop_rx,
				)
				.await;
				tracing::debug!(parachain_id = para_id, "Finalized block source stopped");
			})
			.await
	}

	async fn stop_monitoring(&self) -> Result<(), MonitorError> {
		self.handle.stop().await;
		Ok(())
	}
}
