//! Chain monitoring for the on-demand coretime watcher.
//!
//! This module turns relay chain and parachain activity into `WatcherEvent`s
//! for the control loop. Each source runs in its own task, survives
//! connection loss by re-subscribing with exponential backoff, and only ever
//! talks to the controller through the event channel.

use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use coretime_types::{OrderingMode, WatcherEvent};
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Re-export implementations
pub mod implementations {
	pub mod substrate;
}

pub mod sources;

pub use sources::blocks::FinalizedBlockSource;
pub use sources::pool::PoolSampler;
pub use sources::queue::{AffinityTracker, QueueMonitor};

/// Errors that can occur while watching the chains.
#[derive(Debug, Error)]
pub enum MonitorError {
	/// Error that occurs when no endpoint can be reached.
	#[error("Connection error: {0}")]
	Connection(String),
	/// Error that occurs when a subscription or RPC query fails.
	#[error("Subscription error: {0}")]
	Subscription(String),
	/// Error that occurs when chain data cannot be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
	/// Error that occurs when trying to start monitoring on an already active source.
	#[error("Already monitoring")]
	AlreadyMonitoring,
}

/// Finalized relay chain block numbers.
pub type BlockStream = BoxStream<'static, Result<u64, MonitorError>>;

/// Core index assigned to a parachain, `None` while no core is held.
pub type AffinityStream = BoxStream<'static, Result<Option<u32>, MonitorError>>;

/// Read access to a chain, as needed by the signal sources.
#[async_trait]
pub trait ChainInterface: Send + Sync {
	/// Subscribes to finalized block numbers.
	async fn finalized_blocks(&self) -> Result<BlockStream, MonitorError>;

	/// Returns the number of extrinsics currently waiting in the node's pool.
	async fn pending_transaction_count(&self) -> Result<usize, MonitorError>;

	/// Watches `OnDemand::ParaIdAffinity` for the parachain.
	///
	/// Consecutive equal values are not repeated.
	async fn core_affinity(&self, para_id: u32) -> Result<AffinityStream, MonitorError>;

	/// Number of the current connection; bumped by every successful reconnect.
	fn connection_generation(&self) -> u64 {
		0
	}

	/// Re-establishes the connection that was current at generation `seen`.
	///
	/// Returns without reconnecting when another caller already replaced it,
	/// so sources sharing a chain open one new connection between them.
	async fn reconnect(&self, _seen: u64) -> Result<(), MonitorError> {
		Ok(())
	}
}

/// Trait defining the interface for a signal source.
///
/// Sources push events through the provided channel until `stop_monitoring`
/// is called or the receiving side is dropped.
#[async_trait]
pub trait MonitorInterface: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &'static str;

	/// Spawns the source task.
	async fn start_monitoring(
		&self,
		sender: mpsc::UnboundedSender<WatcherEvent>,
	) -> Result<(), MonitorError>;

	/// Signals the source task to stop.
	async fn stop_monitoring(&self) -> Result<(), MonitorError>;
}

/// Backoff used by every source when re-subscribing: 1s initial delay,
/// capped at 60s, retried forever.
pub fn reconnect_backoff() -> ExponentialBackoff {
	ExponentialBackoffBuilder::new()
		.with_initial_interval(Duration::from_secs(1))
		.with_max_interval(Duration::from_secs(60))
		.with_max_elapsed_time(None)
		.build()
}

/// Builds the sources needed for an ordering mode.
///
/// Block mode counts relay chain finalized blocks; transaction pool mode
/// samples the parachain pool. The queue monitor runs in both modes.
pub fn create_sources(
	mode: OrderingMode,
	relay: Arc<dyn ChainInterface>,
	parachain: Option<Arc<dyn ChainInterface>>,
	para_id: u32,
	check_interval: Duration,
) -> Result<Vec<Box<dyn MonitorInterface>>, MonitorError> {
	let signal: Box<dyn MonitorInterface> = match mode {
		OrderingMode::Block => Box::new(FinalizedBlockSource::new(relay.clone(), para_id)),
		OrderingMode::TransactionPool => {
			let parachain = parachain.ok_or_else(|| {
				MonitorError::Connection("Transaction pool mode needs a parachain connection".to_string())
			})?;
			Box::new(PoolSampler::new(parachain, para_id, check_interval))
		}
	};

	Ok(vec![signal, Box::new(QueueMonitor::new(relay, para_id))])
}

/// Service that manages the signal sources of one watcher.
pub struct MonitorService {
	sources: Vec<Box<dyn MonitorInterface>>,
}

impl MonitorService {
	pub fn new(sources: Vec<Box<dyn MonitorInterface>>) -> Self {
		Self { sources }
	}

	/// Starts every source. Fails on the first source that cannot start.
	pub async fn start_all(
		&self,
		sender: mpsc::UnboundedSender<WatcherEvent>,
	) -> Result<(), MonitorError> {
		for source in &self.sources {
			source.start_monitoring(sender.clone()).await?;
			tracing::debug!(source = source.name(), "Source started");
		}
		Ok(())
	}

	/// Stops every source, even if some fail. Returns the first error.
	pub async fn stop_all(&self) -> Result<(), MonitorError> {
		let mut first_error = None;
		for source in &self.sources {
			if let Err(e) = source.stop_monitoring().await {
				tracing::warn!(source = source.name(), error = %e, "Failed to stop source");
				first_error.get_or_insert(e);
			}
		}
		first_error.map_or(Ok(()), Err)
	}
}
