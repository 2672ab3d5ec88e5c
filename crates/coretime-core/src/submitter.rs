//! Order submission.
//!
//! Places an order through the delivery service and reduces the extrinsic's
//! lifecycle to exactly one `SubmissionEvent`. The submitter never touches
//! the order state; the controller applies the outcome.

use coretime_delivery::{DeliveryService, StatusStream};
use coretime_types::{truncate_id, CoretimeOrder, SubmissionEvent, TransactionStatus, TxHash, WatcherEvent};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::instrument;

#[derive(Clone)]
pub struct OrderSubmitter {
	delivery: Arc<DeliveryService>,
}

impl OrderSubmitter {
	pub fn new(delivery: Arc<DeliveryService>) -> Self {
		Self { delivery }
	}

	/// Submits the order and waits for its terminal outcome.
	#[instrument(skip_all, fields(order_id = order.id, parachain_id = order.para_id))]
	pub async fn submit(&self, order: CoretimeOrder) -> SubmissionEvent {
		let result = match self.delivery.place_order(&order).await {
			Ok(statuses) => await_terminal(statuses).await,
			Err(e) => Err(e.to_string()),
		};

		match result {
			Ok(tx_hash) => SubmissionEvent::Finalized {
				order_id: order.id,
				tx_hash,
			},
			Err(reason) => SubmissionEvent::Failed {
				order_id: order.id,
				reason,
			},
		}
	}

	/// Runs `submit` in its own task and sends the outcome to the control loop.
	pub fn spawn(
		&self,
		order: CoretimeOrder,
		sender: mpsc::UnboundedSender<WatcherEvent>,
	) -> JoinHandle<()> {
		let submitter = self.clone();
		tokio::spawn(async move {
			let outcome = submitter.submit(order).await;
			// the receiver is gone only during shutdown
			let _ = sender.send(outcome.into());
		})
	}
}

/// Follows a lifecycle stream until its first terminal status.
///
/// Returns the finalized extrinsic hash, or the failure reason. A stream that
/// ends without a terminal status counts as a failure.
pub async fn await_terminal(mut statuses: StatusStream) -> Result<TxHash, String> {
	while let Some(status) = statuses.next().await {
		match status {
			Ok(TransactionStatus::Finalized(hash)) => return Ok(hash),
			Ok(TransactionStatus::Dropped(reason)) => return Err(format!("Dropped: {}", reason)),
			Ok(TransactionStatus::Invalid(reason)) => return Err(format!("Invalid: {}", reason)),
			Ok(TransactionStatus::Failed(reason)) => return Err(reason),
			Ok(TransactionStatus::InBlock(hash)) => {
				tracing::info!(tx_hash = %truncate_id(&hash.to_string()), "Order included in block");
			}
			Ok(status) => {
				tracing::debug!(?status, "Order status");
			}
			Err(e) => return Err(e.to_string()),
		}
	}
	Err("Status stream ended before a terminal status".to_string())
}
