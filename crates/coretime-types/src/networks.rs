//! Supported relay chains and their public RPC endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Relay chains the watcher can order coretime from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayChain {
	Kusama,
	Polkadot,
	Westend,
	Rococo,
	Paseo,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported relay chain: {0}")]
pub struct UnsupportedRelayChain(pub String);

impl RelayChain {
	pub const ALL: [RelayChain; 5] = [
		RelayChain::Kusama,
		RelayChain::Polkadot,
		RelayChain::Westend,
		RelayChain::Rococo,
		RelayChain::Paseo,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			RelayChain::Kusama => "kusama",
			RelayChain::Polkadot => "polkadot",
			RelayChain::Westend => "westend",
			RelayChain::Rococo => "rococo",
			RelayChain::Paseo => "paseo",
		}
	}

	/// Public WebSocket endpoints, tried in order.
	pub fn default_rpc_urls(&self) -> &'static [&'static str] {
		match self {
			RelayChain::Kusama => &["wss://kusama-rpc.polkadot.io"],
			RelayChain::Polkadot => &["wss://rpc.polkadot.io"],
			RelayChain::Westend => &["wss://westend-rpc.polkadot.io"],
			RelayChain::Rococo => &["wss://rococo-rpc.polkadot.io"],
			RelayChain::Paseo => &["wss://paseo.rpc.amforc.com", "wss://paseo-rpc.dwellir.com"],
		}
	}
}

impl fmt::Display for RelayChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RelayChain {
	type Err = UnsupportedRelayChain;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RelayChain::ALL
			.into_iter()
			.find(|chain| chain.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| UnsupportedRelayChain(s.to_string()))
	}
}
