//! Substrate chain access through subxt.
//!
//! One `SubxtChain` is opened per chain. The relay chain connection is shared
//! with the delivery layer through [`SubxtChain::shared_client`], so a
//! reconnect performed here also heals order submission.

use crate::{AffinityStream, BlockStream, ChainInterface, MonitorError};
use async_trait::async_trait;
use futures::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::dynamic::Value;
use subxt::ext::scale_value::{Composite, ValueDef};
use subxt::{OnlineClient, PolkadotConfig};
use tokio::sync::{Mutex, RwLock};

const ON_DEMAND_PALLET: &str = "OnDemand";
const AFFINITY_ENTRY: &str = "ParaIdAffinity";

/// Connection to one substrate chain, tried against each endpoint in order.
pub struct SubxtChain {
	endpoints: Vec<String>,
	rpc: RwLock<RpcClient>,
	client: Arc<RwLock<OnlineClient<PolkadotConfig>>>,
	gate: ConnectionGate,
}

/// Serializes reconnects and numbers the connections they produce.
#[derive(Default)]
struct ConnectionGate {
	generation: AtomicU64,
	reconnecting: Mutex<()>,
}

impl ConnectionGate {
	fn current(&self) -> u64 {
		self.generation.load(Ordering::SeqCst)
	}

	/// Runs `connect` unless the connection of generation `seen` has already
	/// been replaced. Returns whether `connect` ran.
	async fn replace<F, Fut>(&self, seen: u64, connect: F) -> Result<bool, MonitorError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<(), MonitorError>>,
	{
		let _guard = self.reconnecting.lock().await;
		if self.current() != seen {
			return Ok(false);
		}
		connect().await?;
		self.generation.fetch_add(1, Ordering::SeqCst);
		Ok(true)
	}
}

impl SubxtChain {
	/// Connects to the first reachable endpoint.
	pub async fn connect(endpoints: &[String]) -> Result<Self, MonitorError> {
		let (rpc, client) = open_connection(endpoints).await?;
		Ok(Self {
			endpoints: endpoints.to_vec(),
			rpc: RwLock::new(rpc),
			client: Arc::new(RwLock::new(client)),
			gate: ConnectionGate::default(),
		})
	}

	/// Handle to the current client; updated in place on reconnect.
	pub fn shared_client(&self) -> Arc<RwLock<OnlineClient<PolkadotConfig>>> {
		self.client.clone()
	}

	async fn client(&self) -> OnlineClient<PolkadotConfig> {
		self.client.read().await.clone()
	}
}

async fn open_connection(
	endpoints: &[String],
) -> Result<(RpcClient, OnlineClient<PolkadotConfig>), MonitorError> {
	let mut last_error = String::from("no endpoints configured");

	for url in endpoints {
		let rpc = match RpcClient::from_url(url).await {
			Ok(rpc) => rpc,
			Err(e) => {
				tracing::warn!(%url, error = %e, "Endpoint unreachable");
				last_error = e.to_string();
				continue;
			}
		};

		match OnlineClient::<PolkadotConfig>::from_rpc_client(rpc.clone()).await {
			Ok(client) => {
				tracing::info!(%url, "Connected");
				return Ok((rpc, client));
			}
			Err(e) => {
				tracing::warn!(%url, error = %e, "Failed to initialise client");
				last_error = e.to_string();
			}
		}
	}

	Err(MonitorError::Connection(format!(
		"No endpoint reachable: {}",
		last_error
	)))
}

/// Extracts the core index from a decoded `CoreAffinityCount`.
///
/// `CoreIndex` is a newtype, so the number may sit behind any depth of
/// single-field composites.
pub fn decode_core_index<T>(affinity: &Value<T>) -> Option<u32> {
	let core_index = match &affinity.value {
		ValueDef::Composite(Composite::Named(fields)) => fields
			.iter()
			.find(|(name, _)| name == "core_index")
			.map(|(_, value)| value)?,
		_ => return None,
	};
	unwrap_number(core_index).and_then(|n| u32::try_from(n).ok())
}

fn unwrap_number<T>(value: &Value<T>) -> Option<u128> {
	match &value.value {
		ValueDef::Composite(Composite::Unnamed(fields)) if fields.len() == 1 => unwrap_number(&fields[0]),
		ValueDef::Composite(Composite::Named(fields)) if fields.len() == 1 => unwrap_number(&fields[0].1),
		_ => value.as_u128(),
	}
}

#[async_trait]
impl ChainInterface for SubxtChain {
	async fn finalized_blocks(&self) -> Result<BlockStream, MonitorError> {
		let blocks = self
			.client()
			.await
			.blocks()
			.subscribe_finalized()
			.await
			.map_err(|e| MonitorError::Subscription(e.to_string()))?;

		Ok(blocks
			.map(|block| match block {
				Ok(block) => {
					let number: u64 = block.number().into();
					Ok(number)
				}
				Err(e) => Err(MonitorError::Subscription(e.to_string())),
			})
			.boxed())
	}

	async fn pending_transaction_count(&self) -> Result<usize, MonitorError> {
		let rpc = self.rpc.read().await.clone();
		let pending = LegacyRpcMethods::<PolkadotConfig>::new(rpc)
			.author_pending_extrinsics()
			.await
			.map_err(|e| MonitorError::Subscription(e.to_string()))?;
		Ok(pending.len())
	}

	async fn core_affinity(&self, para_id: u32) -> Result<AffinityStream, MonitorError> {
		let mut blocks = self
			.client()
			.await
			.blocks()
			.subscribe_finalized()
			.await
			.map_err(|e| MonitorError::Subscription(e.to_string()))?;

		let stream = async_stream::stream! {
			let mut last: Option<Option<u32>> = None;

			while let Some(block) = blocks.next().await {
				let block = match block {
					Ok(block) => block,
					Err(e) => {
						yield Err(MonitorError::Subscription(e.to_string()));
						break;
					}
				};

				let address = subxt::dynamic::storage(
					ON_DEMAND_PALLET,
					AFFINITY_ENTRY,
					vec![Value::u128(para_id as u128)],
				);
				let entry = match block.storage().fetch(&address).await {
					Ok(entry) => entry,
					Err(e) => {
						yield Err(MonitorError::Subscription(e.to_string()));
						break;
					}
				};

				let current = match entry {
					None => None,
					Some(thunk) => {
						let decoded = thunk
							.to_value()
							.map_err(|e| MonitorError::Decode(e.to_string()))
							.and_then(|value| {
								decode_core_index(&value).ok_or_else(|| {
									MonitorError::Decode("ParaIdAffinity without core_index".to_string())
								})
							});
						match decoded {
							Ok(core_index) => Some(core_index),
							Err(e) => {
								yield Err(e);
								break;
							}
						}
					}
				};

				if last != Some(current) {
					last = Some(current);
					yield Ok(current);
				}
			}
		};

		Ok(stream.boxed())
	}

	fn connection_generation(&self) -> u64 {
		self.gate.current()
	}

	async fn reconnect(&self, seen: u64) -> Result<(), MonitorError> {
		let replaced = self
			.gate
			.replace(seen, || async {
				let (rpc, client) = open_connection(&self.endpoints).await?;
				*self.rpc.write().await = rpc;
				*self.client.write().await = client;
				Ok(())
			})
			.await?;
		if !replaced {
			tracing::debug!(seen, "Connection already replaced");
		}
		Ok(())
	}
}
