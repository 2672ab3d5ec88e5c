//! In-process sr25519 account.
//!
//! Accepts every credential form operators use with substrate tooling:
//! a BIP-39 phrase, a secret URI with derivation junctions (`//Alice`,
//! `<phrase>//hard/soft`), or a hex encoded 32-byte seed with or without `0x`.

use crate::{AccountError, AccountInterface};
use coretime_types::SecretString;
use std::str::FromStr;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;

/// Keypair held in memory for the lifetime of the process.
pub struct LocalAccount {
	keypair: Keypair,
}

impl LocalAccount {
	pub fn new(keypair: Keypair) -> Self {
		Self { keypair }
	}

	/// Derives the keypair from a phrase, secret URI or hex seed.
	pub fn from_credential(credential: &SecretString) -> Result<Self, AccountError> {
		credential.with_exposed(|raw| {
			let uri = normalize_seed(raw);
			let uri = SecretUri::from_str(&uri)
				.map_err(|e| AccountError::InvalidKey(format!("Cannot parse credential: {}", e)))?;
			let keypair = Keypair::from_uri(&uri)
				.map_err(|e| AccountError::InvalidKey(format!("Cannot derive keypair: {}", e)))?;
			Ok(Self::new(keypair))
		})
	}
}

/// Prefixes a bare 64 digit hex seed with `0x` so it parses as a seed.
fn normalize_seed(raw: &str) -> String {
	let is_bare_seed = raw.len() == 64 && hex::decode(raw).is_ok();
	if is_bare_seed {
		format!("0x{}", raw)
	} else {
		raw.to_string()
	}
}

impl AccountInterface for LocalAccount {
	fn public_key(&self) -> [u8; 32] {
		self.keypair.public_key().0
	}

	fn sign(&self, payload: &[u8]) -> [u8; 64] {
		self.keypair.sign(payload).0
	}
}

/// Factory function to create a local account from the configured credential.
pub fn create_account(credential: &SecretString) -> Result<Box<dyn AccountInterface>, AccountError> {
	Ok(Box::new(LocalAccount::from_credential(credential)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::AccountService;
	use subxt_signer::sr25519::{verify, PublicKey, Signature};

	const ALICE_PUBLIC: &str = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
	const DEV_PHRASE: &str = "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

	#[test]
	fn test_dev_uri_derives_alice() {
		let account = LocalAccount::from_credential(&SecretString::from("//Alice")).unwrap();
		assert_eq!(hex::encode(account.public_key()), ALICE_PUBLIC);
	}

	#[test]
	fn test_phrase_with_junction_derives_alice() {
		let credential = SecretString::from(format!("{}//Alice", DEV_PHRASE));
		let account = LocalAccount::from_credential(&credential).unwrap();
		assert_eq!(hex::encode(account.public_key()), ALICE_PUBLIC);
	}

	#[test]
	fn test_hex_seed_with_and_without_prefix() {
		let seed = "e5be9a5092b81bca64be81d212e7f2f9eba183bb7a90954f7b76361f6edb5c0a";
		let bare = LocalAccount::from_credential(&SecretString::from(seed)).unwrap();
		let prefixed =
			LocalAccount::from_credential(&SecretString::from(format!("0x{}", seed))).unwrap();
		assert_eq!(bare.public_key(), prefixed.public_key());
	}

	#[test]
	fn test_signature_verifies() {
		let account = LocalAccount::from_credential(&SecretString::from("//Bob")).unwrap();
		let payload = b"place_order_keep_alive";
		let signature = Signature(account.sign(payload));
		assert!(verify(&signature, payload, &PublicKey(account.public_key())));
		assert!(!verify(&signature, b"tampered", &PublicKey(account.public_key())));
	}

	#[test]
	fn test_invalid_phrase_rejected() {
		let result = LocalAccount::from_credential(&SecretString::from(
			"these words are not a valid bip thirty nine phrase at all",
		));
		assert!(matches!(result, Err(AccountError::InvalidKey(_))));
	}

	#[test]
	fn test_service_address_is_ss58() {
		let service = AccountService::from_credential(&SecretString::from("//Alice")).unwrap();
		assert_eq!(
			service.address(),
			"5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
		);
	}
}
