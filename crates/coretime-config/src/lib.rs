//! Configuration module for the on-demand coretime watcher.
//!
//! The watcher is configured by a single JSON document (a `.toml` file with the
//! same keys is accepted as well). `${VAR}` and `${VAR:-default}` references are
//! expanded from the environment before parsing, which keeps the funding
//! mnemonic out of the file itself.
//!
//! Loading validates everything that does not depend on the ordering mode.
//! Mode specific thresholds are checked by [`Config::validate_for_mode`] once
//! the command line has been parsed.

use coretime_types::{OrderingMode, RelayChain, SecretString};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing the configuration document.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<serde_json::Error> for ConfigError {
	fn from(err: serde_json::Error) -> Self {
		ConfigError::Parse(err.to_string())
	}
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Watcher configuration, immutable for the lifetime of the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
	/// Relay chain to order coretime from.
	#[serde(deserialize_with = "deserialize_relay_chain")]
	pub relay_chain: RelayChain,
	/// Overrides the built-in public endpoints of the relay chain.
	#[serde(default)]
	pub relay_chain_rpc_urls: Vec<String>,
	/// Parachain endpoints, tried in order. Needed in transaction pool mode.
	#[serde(default)]
	pub parachain_rpc_urls: Vec<String>,
	/// Finalized relay blocks without a purchase before ordering (block mode).
	#[serde(default)]
	pub max_blocks: u64,
	/// BIP-39 phrase or secret URI of the funding account.
	#[serde(default)]
	pub account_mnemonic: Option<SecretString>,
	/// Hex encoded sr25519 seed of the funding account.
	#[serde(default)]
	pub account_private_key: Option<SecretString>,
	/// Maximum spend per order, in the smallest currency unit.
	pub max_amount: u128,
	/// Pending parachain transactions that trigger an order (pool mode).
	#[serde(default)]
	pub max_transactions: usize,
	/// Parachain id the coretime is bought for.
	pub parachain_id: u32,
	/// Interval between transaction pool samples, in milliseconds (pool mode).
	#[serde(default)]
	pub check_interval_ms: u64,
	/// Place one order on the first pool sample, ignoring the threshold.
	#[serde(default)]
	pub initial_order: bool,
	/// Seconds after which a stuck in-flight or queued order is force-cleared.
	/// Zero disables the watchdog.
	#[serde(default = "default_watchdog_timeout_secs")]
	pub watchdog_timeout_secs: u64,
}

/// Returns the default watchdog timeout in seconds.
///
/// Thirty minutes is several times the worst observed finalization lag of an
/// on-demand order, so the watchdog only fires on lost events.
fn default_watchdog_timeout_secs() -> u64 {
	1800
}

fn deserialize_relay_chain<'de, D>(deserializer: D) -> Result<RelayChain, D::Error>
where
	D: Deserializer<'de>,
{
	let name = String::deserialize(deserializer)?;
	name.parse().map_err(serde::de::Error::custom)
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

fn validate_ws_url(field: &str, url: &str) -> Result<(), ConfigError> {
	if url.starts_with("ws://") || url.starts_with("wss://") {
		Ok(())
	} else {
		Err(ConfigError::Validation(format!(
			"{} entry '{}' must start with ws:// or wss://",
			field, url
		)))
	}
}

impl Config {
	/// Loads configuration from a file, expanding environment variables.
	///
	/// Files ending in `.toml` are parsed as TOML, anything else as JSON.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		let content = resolve_env_vars(&raw)?;

		let is_toml = path
			.extension()
			.is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
		let config: Config = if is_toml {
			toml::from_str(&content)?
		} else {
			serde_json::from_str(&content)?
		};

		config.validate()?;
		Ok(config)
	}

	/// Validates the fields every ordering mode relies on.
	///
	/// - Parachain id and maximum spend must be positive
	/// - Exactly one non-empty funding credential must be set
	/// - Every endpoint must be a WebSocket URL
	fn validate(&self) -> Result<(), ConfigError> {
		if self.parachain_id == 0 {
			return Err(ConfigError::Validation(
				"parachainId must be greater than 0".into(),
			));
		}
		if self.max_amount == 0 {
			return Err(ConfigError::Validation(
				"maxAmount must be greater than 0".into(),
			));
		}

		self.credential()?;

		for url in &self.relay_chain_rpc_urls {
			validate_ws_url("relayChainRpcUrls", url)?;
		}
		for url in &self.parachain_rpc_urls {
			validate_ws_url("parachainRpcUrls", url)?;
		}

		Ok(())
	}

	/// Validates the thresholds required by the selected ordering mode.
	pub fn validate_for_mode(&self, mode: OrderingMode) -> Result<(), ConfigError> {
		match mode {
			OrderingMode::Block => {
				if self.max_blocks == 0 {
					return Err(ConfigError::Validation(
						"maxBlocks must be greater than 0 in block mode".into(),
					));
				}
			}
			OrderingMode::TransactionPool => {
				if self.max_transactions == 0 {
					return Err(ConfigError::Validation(
						"maxTransactions must be greater than 0 in transaction_pool mode".into(),
					));
				}
				if self.check_interval_ms == 0 {
					return Err(ConfigError::Validation(
						"checkIntervalMs must be greater than 0 in transaction_pool mode".into(),
					));
				}
				if self.parachain_rpc_urls.is_empty() {
					return Err(ConfigError::Validation(
						"parachainRpcUrls cannot be empty in transaction_pool mode".into(),
					));
				}
			}
		}
		Ok(())
	}

	/// Returns the funding credential.
	///
	/// Exactly one of `accountMnemonic` and `accountPrivateKey` must be set.
	pub fn credential(&self) -> Result<&SecretString, ConfigError> {
		match (&self.account_mnemonic, &self.account_private_key) {
			(Some(_), Some(_)) => Err(ConfigError::Validation(
				"Only one of accountMnemonic and accountPrivateKey may be set".into(),
			)),
			(Some(secret), None) | (None, Some(secret)) => {
				if secret.is_blank() {
					Err(ConfigError::Validation(
						"Funding account credential cannot be empty".into(),
					))
				} else {
					Ok(secret)
				}
			}
			(None, None) => Err(ConfigError::Validation(
				"One of accountMnemonic or accountPrivateKey is required".into(),
			)),
		}
	}

	/// Relay chain endpoints: the configured override or the public defaults.
	pub fn relay_rpc_urls(&self) -> Vec<String> {
		if self.relay_chain_rpc_urls.is_empty() {
			self.relay_chain
				.default_rpc_urls()
				.iter()
				.map(|url| url.to_string())
				.collect()
		} else {
			self.relay_chain_rpc_urls.clone()
		}
	}

	pub fn check_interval(&self) -> Duration {
		Duration::from_millis(self.check_interval_ms)
	}

	/// Returns the watchdog timeout, or `None` when disabled.
	pub fn watchdog_timeout(&self) -> Option<Duration> {
		(self.watchdog_timeout_secs > 0).then(|| Duration::from_secs(self.watchdog_timeout_secs))
	}
}

/// Parses a JSON configuration document and validates it.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let content = resolve_env_vars(s)?;
		let config: Config = serde_json::from_str(&content)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const BLOCK_CONFIG: &str = r#"{
		"relayChain": "polkadot",
		"parachainRpcUrls": ["wss://para.example.org"],
		"maxBlocks": 10,
		"accountMnemonic": "bottom drive obey lake curtain smoke basket hold race lonely fit walk",
		"maxAmount": 100000000,
		"maxTransactions": 50,
		"parachainId": 2000,
		"checkIntervalMs": 5000
	}"#;

	#[test]
	fn test_parse_full_config() {
		let config = Config::from_str(BLOCK_CONFIG).unwrap();
		assert_eq!(config.relay_chain, RelayChain::Polkadot);
		assert_eq!(config.max_blocks, 10);
		assert_eq!(config.max_amount, 100_000_000);
		assert_eq!(config.max_transactions, 50);
		assert_eq!(config.parachain_id, 2000);
		assert_eq!(config.check_interval(), Duration::from_secs(5));
		assert!(!config.initial_order);
		assert_eq!(config.watchdog_timeout(), Some(Duration::from_secs(1800)));
		assert!(config.validate_for_mode(OrderingMode::Block).is_ok());
		assert!(config
			.validate_for_mode(OrderingMode::TransactionPool)
			.is_ok());
	}

	#[test]
	fn test_unsupported_relay_chain_rejected() {
		let json = BLOCK_CONFIG.replace("\"polkadot\"", "\"moonbeam\"");
		let err = Config::from_str(&json).unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
		assert!(
			err.to_string().contains("Unsupported relay chain: moonbeam"),
			"unexpected error: {}",
			err
		);
	}

	#[test]
	fn test_default_relay_urls_used_without_override() {
		let config = Config::from_str(BLOCK_CONFIG).unwrap();
		assert_eq!(config.relay_rpc_urls(), vec!["wss://rpc.polkadot.io"]);

		let json = BLOCK_CONFIG.replace(
			"\"maxBlocks\"",
			"\"relayChainRpcUrls\": [\"ws://127.0.0.1:9944\"], \"maxBlocks\"",
		);
		let config = Config::from_str(&json).unwrap();
		assert_eq!(config.relay_rpc_urls(), vec!["ws://127.0.0.1:9944"]);
	}

	#[test]
	fn test_credential_rules() {
		let both = BLOCK_CONFIG.replace(
			"\"maxAmount\"",
			"\"accountPrivateKey\": \"0x01\", \"maxAmount\"",
		);
		assert!(matches!(
			Config::from_str(&both),
			Err(ConfigError::Validation(msg)) if msg.contains("Only one")
		));

		let none = BLOCK_CONFIG.replace(
			"\"accountMnemonic\": \"bottom drive obey lake curtain smoke basket hold race lonely fit walk\",",
			"",
		);
		assert!(matches!(
			Config::from_str(&none),
			Err(ConfigError::Validation(msg)) if msg.contains("required")
		));

		let blank = BLOCK_CONFIG.replace(
			"bottom drive obey lake curtain smoke basket hold race lonely fit walk",
			"   ",
		);
		assert!(Config::from_str(&blank).is_err());
	}

	#[test]
	fn test_mode_specific_validation() {
		let json = BLOCK_CONFIG
			.replace("\"maxBlocks\": 10,", "")
			.replace("\"checkIntervalMs\": 5000", "\"checkIntervalMs\": 0");
		let config = Config::from_str(&json).unwrap();
		assert!(config.validate_for_mode(OrderingMode::Block).is_err());
		let err = config
			.validate_for_mode(OrderingMode::TransactionPool)
			.unwrap_err();
		assert!(err.to_string().contains("checkIntervalMs"));
	}

	#[test]
	fn test_pool_mode_requires_parachain_urls() {
		let json = BLOCK_CONFIG.replace("\"wss://para.example.org\"", "");
		let config = Config::from_str(&json).unwrap();
		let err = config
			.validate_for_mode(OrderingMode::TransactionPool)
			.unwrap_err();
		assert!(err.to_string().contains("parachainRpcUrls"));
	}

	#[test]
	fn test_http_endpoint_rejected() {
		let json = BLOCK_CONFIG.replace("wss://para.example.org", "https://para.example.org");
		assert!(matches!(
			Config::from_str(&json),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_zero_parachain_id_rejected() {
		let json = BLOCK_CONFIG.replace("2000", "0");
		assert!(matches!(
			Config::from_str(&json),
			Err(ConfigError::Validation(msg)) if msg.contains("parachainId")
		));
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("CORETIME_TEST_MNEMONIC", "//Alice");
		let input = r#"{"secret": "${CORETIME_TEST_MNEMONIC}", "other": "${CORETIME_TEST_UNSET:-fallback}"}"#;
		let resolved = resolve_env_vars(input).unwrap();
		assert_eq!(resolved, r#"{"secret": "//Alice", "other": "fallback"}"#);

		let missing = resolve_env_vars("${CORETIME_TEST_DEFINITELY_UNSET}");
		assert!(matches!(missing, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_watchdog_can_be_disabled() {
		let json = BLOCK_CONFIG.replace("\"maxBlocks\"", "\"watchdogTimeoutSecs\": 0, \"maxBlocks\"");
		let config = Config::from_str(&json).unwrap();
		assert_eq!(config.watchdog_timeout(), None);
	}

	#[tokio::test]
	async fn test_load_json_file() {
		let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
		file.write_all(BLOCK_CONFIG.as_bytes()).unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		assert_eq!(config.parachain_id, 2000);
	}

	#[tokio::test]
	async fn test_load_toml_file() {
		let content = r#"
relayChain = "paseo"
parachainRpcUrls = ["ws://localhost:9988"]
maxBlocks = 5
accountPrivateKey = "0xe5be9a5092b81bca64be81d212e7f2f9eba183bb7a90954f7b76361f6edb5c0a"
maxAmount = 1000000
parachainId = 4242
initialOrder = true
"#;
		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		file.write_all(content.as_bytes()).unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		assert_eq!(config.relay_chain, RelayChain::Paseo);
		assert_eq!(config.parachain_id, 4242);
		assert!(config.initial_order);
		assert!(config.account_private_key.is_some());
	}

	#[tokio::test]
	async fn test_missing_file_is_io_error() {
		let dir = tempfile::tempdir().unwrap();
		let result = Config::from_file(dir.path().join("config.json")).await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
