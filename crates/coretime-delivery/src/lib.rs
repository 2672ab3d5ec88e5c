//! Order delivery for the on-demand coretime watcher.
//!
//! This module builds, signs and submits `OnDemand::place_order_keep_alive`
//! extrinsics to the relay chain and exposes their lifecycle as a stream of
//! `TransactionStatus` values. It does not interpret the lifecycle: deciding
//! what counts as success or failure is left to the caller.

use async_trait::async_trait;
use coretime_account::AccountService;
use coretime_types::{CoretimeOrder, TransactionStatus};
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod substrate;
}

/// Errors that can occur during order delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The node refused the extrinsic before it entered the pool.
	#[error("Submission rejected: {0}")]
	Rejected(String),
}

/// Lifecycle updates of one submitted extrinsic, in the order the node reports them.
///
/// An `Err` item means the watch subscription itself broke; the stream ends after it.
pub type StatusStream = BoxStream<'static, Result<TransactionStatus, DeliveryError>>;

/// Trait defining the interface for order delivery providers.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Signs and submits an order, then returns the stream of its lifecycle updates.
	///
	/// Returns an error only if the extrinsic never reached the transaction pool.
	async fn submit_order(
		&self,
		order: &CoretimeOrder,
		signer: &AccountService,
	) -> Result<StatusStream, DeliveryError>;
}

/// Service that submits orders on behalf of the funding account.
pub struct DeliveryService {
	implementation: Box<dyn DeliveryInterface>,
	/// Account paying for the coretime.
	account: Arc<AccountService>,
}

impl DeliveryService {
	pub fn new(implementation: Box<dyn DeliveryInterface>, account: Arc<AccountService>) -> Self {
		Self {
			implementation,
			account,
		}
	}

	/// Places an on-demand order signed by the funding account.
	pub async fn place_order(&self, order: &CoretimeOrder) -> Result<StatusStream, DeliveryError> {
		tracing::debug!(
			order_id = order.id,
			parachain_id = order.para_id,
			signer = %self.account.address(),
			"Submitting place_order_keep_alive"
		);
		self.implementation.submit_order(order, &self.account).await
	}
}
