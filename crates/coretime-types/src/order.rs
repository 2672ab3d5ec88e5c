//! On-demand order types.
//!
//! Describes a single coretime purchase, the hash of the extrinsic carrying it
//! and the lifecycle states reported while it travels through the relay chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single `place_order_keep_alive` purchase initiated by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoretimeOrder {
	/// Sequence number assigned by the controller.
	pub id: u64,
	/// Parachain the coretime is bought for.
	pub para_id: u32,
	/// Maximum spend, in the relay chain's smallest currency unit.
	pub max_amount: u128,
}

/// Hash of a submitted extrinsic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

impl fmt::Debug for TxHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TxHash({})", self)
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid transaction hash: {0}")]
pub struct TxHashParseError(String);

impl FromStr for TxHash {
	type Err = TxHashParseError;

	/// Parses a hex hash, with or without `0x`. Shorter inputs are left-padded.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let digits = s.strip_prefix("0x").unwrap_or(s);
		if digits.is_empty() || digits.len() > 64 {
			return Err(TxHashParseError(s.to_string()));
		}
		let padded = format!("{:0>64}", digits);
		let mut bytes = [0u8; 32];
		hex::decode_to_slice(&padded, &mut bytes).map_err(|_| TxHashParseError(s.to_string()))?;
		Ok(TxHash(bytes))
	}
}

/// Lifecycle states of a submitted extrinsic.
///
/// Only `Finalized`, `Dropped`, `Invalid` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
	/// Accepted into the node's transaction pool.
	Validated,
	/// Gossiped to peers.
	Broadcast,
	/// Included in a best (not yet final) block.
	InBlock(TxHash),
	/// Included in a finalized block and dispatched successfully.
	Finalized(TxHash),
	/// Removed from the pool without inclusion.
	Dropped(String),
	/// Rejected by the pool as invalid.
	Invalid(String),
	/// Included but dispatch failed, or the node reported an error.
	Failed(String),
}

impl TransactionStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransactionStatus::Finalized(_)
				| TransactionStatus::Dropped(_)
				| TransactionStatus::Invalid(_)
				| TransactionStatus::Failed(_)
		)
	}
}
