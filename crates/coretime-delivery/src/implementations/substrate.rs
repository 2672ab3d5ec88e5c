//! Relay chain delivery through subxt.
//!
//! Uses the dynamic call interface so the watcher does not need generated
//! metadata bindings for each relay chain runtime.

use crate::{DeliveryError, DeliveryInterface, StatusStream};
use async_trait::async_trait;
use coretime_account::AccountService;
use coretime_types::{CoretimeOrder, TransactionStatus, TxHash};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use subxt::dynamic::Value;
use subxt::tx::{TxProgress, TxStatus};
use subxt::{OnlineClient, PolkadotConfig};
use tokio::sync::RwLock;

const ON_DEMAND_PALLET: &str = "OnDemand";
const PLACE_ORDER_CALL: &str = "place_order_keep_alive";

/// Subxt-based delivery implementation.
///
/// The client handle is shared with the relay chain monitor, which swaps in a
/// fresh client after reconnecting.
pub struct SubxtDelivery {
	client: Arc<RwLock<OnlineClient<PolkadotConfig>>>,
}

impl SubxtDelivery {
	pub fn new(client: Arc<RwLock<OnlineClient<PolkadotConfig>>>) -> Self {
		Self { client }
	}
}

/// Call arguments of `place_order_keep_alive`, in declaration order.
pub fn order_call_fields(order: &CoretimeOrder) -> Vec<Value> {
	vec![
		Value::u128(order.max_amount),
		Value::u128(order.para_id as u128),
	]
}

#[async_trait]
impl DeliveryInterface for SubxtDelivery {
	async fn submit_order(
		&self,
		order: &CoretimeOrder,
		signer: &AccountService,
	) -> Result<StatusStream, DeliveryError> {
		let call = subxt::dynamic::tx(ON_DEMAND_PALLET, PLACE_ORDER_CALL, order_call_fields(order));

		let client = self.client.read().await.clone();
		let progress = client
			.tx()
			.sign_and_submit_then_watch_default(&call, signer)
			.await
			.map_err(|e| DeliveryError::Rejected(e.to_string()))?;

		tracing::info!(
			order_id = order.id,
			tx_hash = %TxHash(progress.extrinsic_hash().0),
			"Order extrinsic submitted"
		);

		Ok(watch_progress(progress).boxed())
	}
}

/// Translates the subxt lifecycle into watcher statuses.
///
/// Finalization is only reported as `Finalized` when the extrinsic also
/// dispatched successfully; a dispatch error becomes `Failed`.
fn watch_progress(
	mut progress: TxProgress<PolkadotConfig, OnlineClient<PolkadotConfig>>,
) -> impl Stream<Item = Result<TransactionStatus, DeliveryError>> + Send + 'static {
	async_stream::stream! {
		while let Some(update) = progress.next().await {
			let status = match update {
				Ok(TxStatus::Validated) => TransactionStatus::Validated,
				Ok(TxStatus::Broadcasted { .. }) => TransactionStatus::Broadcast,
				Ok(TxStatus::InBestBlock(in_block)) => {
					TransactionStatus::InBlock(TxHash(in_block.extrinsic_hash().0))
				}
				Ok(TxStatus::InFinalizedBlock(in_block)) => {
					let hash = TxHash(in_block.extrinsic_hash().0);
					match in_block.wait_for_success().await {
						Ok(_) => TransactionStatus::Finalized(hash),
						Err(e) => TransactionStatus::Failed(format!("Dispatch failed: {}", e)),
					}
				}
				Ok(TxStatus::Error { message }) => TransactionStatus::Failed(message),
				Ok(TxStatus::Invalid { message }) => TransactionStatus::Invalid(message),
				Ok(TxStatus::Dropped { message }) => TransactionStatus::Dropped(message),
				Ok(TxStatus::NoLongerInBestBlock) => {
					tracing::debug!("Order extrinsic retracted from best block");
					continue;
				}
				Err(e) => {
					yield Err(DeliveryError::Network(e.to_string()));
					break;
				}
			};

			let terminal = status.is_terminal();
			yield Ok(status);
			if terminal {
				break;
			}
		}
	}
}
