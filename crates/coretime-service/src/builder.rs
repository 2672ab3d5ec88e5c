//! Wires the concrete implementations into an engine.

use crate::error::ServiceError;
use coretime_account::AccountService;
use coretime_config::Config;
use coretime_core::CoretimeEngine;
use coretime_delivery::implementations::substrate::SubxtDelivery;
use coretime_delivery::DeliveryService;
use coretime_monitor::implementations::substrate::SubxtChain;
use coretime_monitor::{create_sources, ChainInterface, MonitorService};
use coretime_types::{display_planck, OrderingMode};
use std::sync::Arc;

/// Validates the mode, derives the signer and opens the chain connections.
///
/// Any failure here is fatal; connection problems after startup are handled
/// by the sources.
pub async fn build_engine(config: &Config, mode: OrderingMode) -> Result<CoretimeEngine, ServiceError> {
	config.validate_for_mode(mode)?;

	let account = Arc::new(AccountService::from_credential(config.credential()?)?);
	tracing::info!(
		address = %account.address(),
		max_amount = %display_planck(config.max_amount),
		"Loaded funding account"
	);

	let relay = Arc::new(SubxtChain::connect(&config.relay_rpc_urls()).await?);
	let parachain: Option<Arc<dyn ChainInterface>> = match mode {
		OrderingMode::Block => None,
		OrderingMode::TransactionPool => {
			Some(Arc::new(SubxtChain::connect(&config.parachain_rpc_urls).await?))
		}
	};

	let delivery = Arc::new(DeliveryService::new(
		Box::new(SubxtDelivery::new(relay.shared_client())),
		account,
	));

	let sources = create_sources(
		mode,
		relay,
		parachain,
		config.parachain_id,
		config.check_interval(),
	)?;

	Ok(CoretimeEngine::from_config(
		config,
		mode,
		MonitorService::new(sources),
		delivery,
	))
}
