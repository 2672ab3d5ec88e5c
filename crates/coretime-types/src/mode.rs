//! Ordering mode selected on the command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which signal decides that coretime should be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
	/// Order after a number of relay chain blocks without a purchase.
	Block,
	/// Order when the parachain's transaction pool grows past a threshold.
	TransactionPool,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown ordering mode '{0}', expected 'block' or 'transaction_pool'")]
pub struct UnknownMode(pub String);

impl OrderingMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderingMode::Block => "block",
			OrderingMode::TransactionPool => "transaction_pool",
		}
	}
}

impl fmt::Display for OrderingMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderingMode {
	type Err = UnknownMode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"block" => Ok(OrderingMode::Block),
			// "txpool" is the name older configurations and scripts use
			"transaction_pool" | "txpool" => Ok(OrderingMode::TransactionPool),
			other => Err(UnknownMode(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_modes() {
		assert_eq!("block".parse::<OrderingMode>().unwrap(), OrderingMode::Block);
		assert_eq!(
			"transaction_pool".parse::<OrderingMode>().unwrap(),
			OrderingMode::TransactionPool
		);
		assert_eq!(
			"txpool".parse::<OrderingMode>().unwrap(),
			OrderingMode::TransactionPool
		);
	}

	#[test]
	fn test_unknown_mode() {
		let err = "blocks".parse::<OrderingMode>().unwrap_err();
		assert_eq!(err, UnknownMode("blocks".to_string()));
		assert!(err.to_string().contains("transaction_pool"));
	}
}
