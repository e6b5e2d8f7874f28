//! Access to the contracts that verify and consume permits.
//!
//! The token, bank and market contracts own all authoritative state: nonce
//! counters, used-markers, the issuer whitelist. This crate only reads that
//! state and submits the two consuming entry points, `permitDeposit` and
//! `permitBuy`. Each entry point verifies and consumes in one transaction, so
//! there is no verified-but-unconsumed window to guard against here.
//!
//! Submission is fire-and-forget: `submit_*` returns a handle once the
//! transaction is accepted for inclusion and the verdict is read later with
//! [`VerifierInterface::outcome`]. A verdict the node can determine before
//! inclusion is returned straight away as [`VerifierError::Rejected`].

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use permit_types::{
	ConfigSchema, ContractDeployment, ImplementationRegistry, Listing, ListingError, SecretString,
	SignatureParts,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub mod implementations {
	pub mod rpc;
	pub mod simulated;
}
pub mod precheck;

/// Why a contract refused a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectionReason {
	/// The permit's nonce is no longer the owner's current nonce.
	StaleNonce,
	/// `deadline` is before the block timestamp.
	Expired,
	/// The purchase permit was already used.
	AlreadyConsumed,
	/// The recovered signer is not the owner, or not whitelisted.
	UnauthorizedSigner,
	Other(String),
}

impl fmt::Display for RejectionReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RejectionReason::StaleNonce => write!(f, "stale nonce"),
			RejectionReason::Expired => write!(f, "permit expired"),
			RejectionReason::AlreadyConsumed => write!(f, "permit already consumed"),
			RejectionReason::UnauthorizedSigner => write!(f, "unauthorized signer"),
			RejectionReason::Other(detail) => write!(f, "{}", detail),
		}
	}
}

#[derive(Debug, Error)]
pub enum VerifierError {
	#[error("Network error: {0}")]
	Network(String),
	/// Refused before inclusion, e.g. during gas estimation.
	#[error("Permit rejected: {0}")]
	Rejected(RejectionReason),
	#[error("Invalid configuration: {0}")]
	Configuration(String),
	#[error("Unknown submission {0}")]
	UnknownSubmission(B256),
	#[error(transparent)]
	Listing(#[from] ListingError),
}

/// Arguments of `TokenBank.permitDeposit(value, deadline, v, r, s)`.
///
/// Owner and nonce are not arguments: the bank takes the owner from the
/// sender and the token reads the nonce from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositCall {
	pub value: U256,
	pub deadline: U256,
	pub signature: SignatureParts,
}

/// Arguments of `NFTMarket.permitBuy(tokenId, deadline, v, r, s)`. The buyer is the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseCall {
	pub token_id: U256,
	pub deadline: U256,
	pub signature: SignatureParts,
}

/// Identifies a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubmissionHandle(pub B256);

impl fmt::Display for SubmissionHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
	Pending,
	Confirmed,
	Rejected(RejectionReason),
}

#[async_trait]
pub trait VerifierInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Chain id of the connected chain, read fresh on each call.
	async fn chain_id(&self) -> Result<u64, VerifierError>;

	/// Current block timestamp.
	async fn timestamp(&self) -> Result<u64, VerifierError>;

	/// `HTToken.nonces(owner)`: a point-in-time read, stale as soon as it returns.
	async fn nonce(&self, owner: Address) -> Result<U256, VerifierError>;

	/// `NFTMarket.isWhitelisted(account)`.
	async fn is_whitelisted(&self, account: Address) -> Result<bool, VerifierError>;

	/// `NFTMarket.getAllListings()`, zipped by index.
	async fn listings(&self) -> Result<Vec<Listing>, VerifierError>;

	/// `TokenBank.balances(owner)`.
	async fn deposited(&self, owner: Address) -> Result<U256, VerifierError>;

	/// Sends `permitDeposit` from `from`.
	async fn submit_deposit(
		&self,
		from: Address,
		call: DepositCall,
	) -> Result<SubmissionHandle, VerifierError>;

	/// Sends `permitBuy` from `from`, who must be the buyer named in the permit.
	async fn submit_purchase(
		&self,
		from: Address,
		call: PurchaseCall,
	) -> Result<SubmissionHandle, VerifierError>;

	async fn outcome(&self, handle: &SubmissionHandle) -> Result<SubmissionOutcome, VerifierError>;
}

/// Builds a verifier from its TOML table, the contract addresses and an
/// optional key for sending transactions.
pub type VerifierFactory = fn(
	&toml::Value,
	&ContractDeployment,
	Option<&SecretString>,
) -> Result<Box<dyn VerifierInterface>, VerifierError>;

pub trait VerifierRegistry: ImplementationRegistry<Factory = VerifierFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, VerifierFactory)> {
	use implementations::{rpc, simulated};

	vec![
		(rpc::Registry::NAME, rpc::Registry::factory()),
		(simulated::Registry::NAME, simulated::Registry::factory()),
	]
}
