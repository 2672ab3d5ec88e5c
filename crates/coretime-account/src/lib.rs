//! Funding account for on-demand coretime orders.
//!
//! This crate turns the configured credential into a signer once at startup.
//! After that the signer is stateless: it exposes the account's public key and
//! signs extrinsic payloads handed to it by the delivery layer.

use coretime_types::SecretString;
use subxt::utils::{AccountId32, MultiSignature};
use subxt::PolkadotConfig;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The credential is neither a valid secret URI nor a valid seed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for account implementations.
///
/// Signing is synchronous: the extrinsic builder calls it in the middle of
/// constructing a transaction.
pub trait AccountInterface: Send + Sync {
	/// Returns the 32-byte sr25519 public key of the account.
	fn public_key(&self) -> [u8; 32];

	/// Signs an arbitrary payload and returns the 64-byte sr25519 signature.
	fn sign(&self, payload: &[u8]) -> [u8; 64];
}

/// Service that manages account operations.
///
/// It also acts as the extrinsic signer for the relay chain client.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Builds the service from the configured credential.
	pub fn from_credential(credential: &SecretString) -> Result<Self, AccountError> {
		implementations::local::create_account(credential).map(Self::new)
	}

	pub fn public_key(&self) -> [u8; 32] {
		self.implementation.public_key()
	}

	pub fn account_id(&self) -> AccountId32 {
		AccountId32(self.public_key())
	}

	/// SS58 address with the generic substrate prefix, for logs.
	pub fn address(&self) -> String {
		self.account_id().to_string()
	}

	pub fn sign(&self, payload: &[u8]) -> [u8; 64] {
		self.implementation.sign(payload)
	}
}

impl subxt::tx::Signer<PolkadotConfig> for AccountService {
	fn account_id(&self) -> AccountId32 {
		AccountService::account_id(self)
	}

	fn sign(&self, signer_payload: &[u8]) -> MultiSignature {
		MultiSignature::Sr25519(AccountService::sign(self, signer_payload))
	}
}
