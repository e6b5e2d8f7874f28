//! Signing capability for permit issuers.
//!
//! The issuer never touches key material directly. It hands a
//! [`TypedDataRequest`] to a [`SignerInterface`] implementation and gets back
//! 65 signature bytes, or a refusal. A refusal is an ordinary outcome: the
//! key holder may decline, and the issuer surfaces that without retrying.

use alloy::primitives::Address;
use async_trait::async_trait;
use permit_types::{
	ConfigSchema, ImplementationRegistry, SecretString, TypedDataRequest, SIGNATURE_LENGTH,
};
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	/// The key holder refused to sign.
	#[error("Signing declined: {0}")]
	Declined(String),
	/// The signing capability could not be reached.
	#[error("Signer unavailable: {0}")]
	Unavailable(String),
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Schema for this implementation's `[account.implementations.<name>]` table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address whose key produces the signatures.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs the EIP-712 digest of `request`, returning `r || s || v`.
	///
	/// Implementations may return `v` as 0/1 or 27/28; callers normalize.
	/// This call may wait on a human and carries no timeout.
	async fn sign_typed_data(
		&self,
		request: &TypedDataRequest,
	) -> Result<[u8; SIGNATURE_LENGTH], AccountError>;

	/// Raw key for transaction submission, if the implementation holds one.
	fn get_private_key(&self) -> Option<SecretString>;
}

pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn SignerInterface>, AccountError>;

pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Every account implementation, as `(config name, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Thin wrapper the issuer and the binary hold instead of the trait object.
pub struct AccountService {
	implementation: Box<dyn SignerInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn SignerInterface>) -> Self {
		Self { implementation }
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	pub async fn sign_typed_data(
		&self,
		request: &TypedDataRequest,
	) -> Result<[u8; SIGNATURE_LENGTH], AccountError> {
		tracing::debug!(
			primary_type = request.primary_type(),
			domain = %request.domain.name,
			chain_id = request.domain.chain_id,
			"Requesting typed-data signature"
		);
		self.implementation.sign_typed_data(request).await
	}

	pub fn get_private_key(&self) -> Option<SecretString> {
		self.implementation.get_private_key()
	}
}
