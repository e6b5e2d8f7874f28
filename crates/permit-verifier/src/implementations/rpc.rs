//! JSON-RPC verifier backed by the deployed contracts.
//!
//! Reads go through `eth_call`. Submissions are signed by the configured key
//! and sent without waiting for inclusion. Reverts surfaced during gas
//! estimation are classified into [`RejectionReason`]s from the revert data:
//! OpenZeppelin's `ERC2612*` custom errors for the token, revert strings for
//! the market.

use crate::{
	DepositCall, PurchaseCall, RejectionReason, SubmissionHandle, SubmissionOutcome,
	VerifierError, VerifierInterface,
};
use alloy::contract::Error as ContractError;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::BlockNumberOrTag;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::{decode_revert_reason, SolError};
use alloy::transports::{http::reqwest::Url, TransportError};
use async_trait::async_trait;
use permit_types::{
	zip_listings, ConfigSchema, ContractDeployment, Field, FieldType, Listing, Schema,
	SecretString, ValidationError,
};
use std::time::Duration;

sol! {
	#[sol(rpc)]
	contract HTToken {
		error ERC2612ExpiredSignature(uint256 deadline);
		error ERC2612InvalidSigner(address signer, address owner);

		function nonces(address owner) external view returns (uint256);
	}

	#[sol(rpc)]
	contract TokenBank {
		function permitDeposit(uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
		function balances(address account) external view returns (uint256);
	}

	#[sol(rpc)]
	contract NFTMarket {
		function permitBuy(uint256 tokenId, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
		function isWhitelisted(address account) external view returns (bool);
		function getAllListings() external view returns (
			uint256[] memory tokenIds,
			address[] memory sellers,
			uint256[] memory prices,
			bool[] memory actives
		);
	}
}

pub struct RpcVerifier {
	provider: DynProvider,
	token: HTToken::HTTokenInstance<DynProvider>,
	bank: TokenBank::TokenBankInstance<DynProvider>,
	market: NFTMarket::NFTMarketInstance<DynProvider>,
	/// Address of the sending wallet, if a key was configured.
	sender: Option<Address>,
}

impl RpcVerifier {
	pub fn new(
		rpc_url: &str,
		contracts: &ContractDeployment,
		signer: Option<PrivateKeySigner>,
		poll_interval: Duration,
	) -> Result<Self, VerifierError> {
		let url = Url::parse(rpc_url)
			.map_err(|e| VerifierError::Configuration(format!("Invalid RPC URL: {}", e)))?;

		let sender = signer.as_ref().map(|s| s.address());
		let provider = match signer {
			Some(signer) => DynProvider::new(ProviderBuilder::new().wallet(signer).connect_http(url)),
			None => DynProvider::new(ProviderBuilder::new().connect_http(url)),
		};
		provider.client().set_poll_interval(poll_interval);

		Ok(Self {
			token: HTToken::new(contracts.token.address, provider.clone()),
			bank: TokenBank::new(contracts.bank, provider.clone()),
			market: NFTMarket::new(contracts.market.address, provider.clone()),
			provider,
			sender,
		})
	}

	fn ensure_sender(&self, from: Address) -> Result<(), VerifierError> {
		match self.sender {
			Some(sender) if sender == from => Ok(()),
			Some(sender) => Err(VerifierError::Configuration(format!(
				"Submission from {} but the configured key is {}",
				from, sender
			))),
			None => Err(VerifierError::Configuration(
				"No signing key configured for submissions".to_string(),
			)),
		}
	}
}

/// Maps a revert reason string to a rejection.
pub(crate) fn classify_reason(reason: &str) -> RejectionReason {
	let lower = reason.to_lowercase();
	if lower.contains("expired") || lower.contains("deadline") {
		RejectionReason::Expired
	} else if lower.contains("used") || lower.contains("consumed") {
		RejectionReason::AlreadyConsumed
	} else if lower.contains("nonce") {
		RejectionReason::StaleNonce
	} else if lower.contains("whitelist") || lower.contains("signer") || lower.contains("signature")
	{
		RejectionReason::UnauthorizedSigner
	} else {
		RejectionReason::Other(reason.to_string())
	}
}

/// Classifies raw revert data: token custom errors by selector, then `Error(string)`.
pub(crate) fn rejection_from_revert_data(data: &[u8]) -> Option<RejectionReason> {
	let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
	if selector == HTToken::ERC2612ExpiredSignature::SELECTOR {
		return Some(RejectionReason::Expired);
	}
	if selector == HTToken::ERC2612InvalidSigner::SELECTOR {
		return Some(RejectionReason::UnauthorizedSigner);
	}
	decode_revert_reason(data).map(|reason| classify_reason(&reason))
}

fn map_send_error(err: ContractError) -> VerifierError {
	if let ContractError::TransportError(TransportError::ErrorResp(payload)) = &err {
		if let Some(reason) = payload
			.as_revert_data()
			.and_then(|data| rejection_from_revert_data(&data))
		{
			return VerifierError::Rejected(reason);
		}
		if payload.message.contains("revert") {
			return VerifierError::Rejected(classify_reason(&payload.message));
		}
	}
	VerifierError::Network(err.to_string())
}

fn map_read_error(what: &str, err: ContractError) -> VerifierError {
	VerifierError::Network(format!("Failed to read {}: {}", what, err))
}

pub struct RpcVerifierSchema;

impl RpcVerifierSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for RpcVerifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("rpc_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
						Ok(())
					},
					_ => Err("rpc_url must be an http(s) URL".to_string()),
				}
			})],
			vec![Field::new("poll_interval_ms", FieldType::Integer {
				min: Some(100),
				max: Some(60_000),
			})],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl VerifierInterface for RpcVerifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RpcVerifierSchema)
	}

	async fn chain_id(&self) -> Result<u64, VerifierError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| VerifierError::Network(format!("Failed to get chain id: {}", e)))
	}

	async fn timestamp(&self) -> Result<u64, VerifierError> {
		let block = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Latest)
			.await
			.map_err(|e| VerifierError::Network(format!("Failed to get latest block: {}", e)))?
			.ok_or_else(|| VerifierError::Network("Latest block not available".to_string()))?;
		Ok(block.header.timestamp)
	}

	async fn nonce(&self, owner: Address) -> Result<U256, VerifierError> {
		self.token
			.nonces(owner)
			.call()
			.await
			.map_err(|e| map_read_error("nonce", e))
	}

	async fn is_whitelisted(&self, account: Address) -> Result<bool, VerifierError> {
		self.market
			.isWhitelisted(account)
			.call()
			.await
			.map_err(|e| map_read_error("whitelist", e))
	}

	async fn listings(&self) -> Result<Vec<Listing>, VerifierError> {
		let result = self
			.market
			.getAllListings()
			.call()
			.await
			.map_err(|e| map_read_error("listings", e))?;
		Ok(zip_listings(
			result.tokenIds,
			result.sellers,
			result.prices,
			result.actives,
		)?)
	}

	async fn deposited(&self, owner: Address) -> Result<U256, VerifierError> {
		self.bank
			.balances(owner)
			.call()
			.await
			.map_err(|e| map_read_error("bank balance", e))
	}

	async fn submit_deposit(
		&self,
		from: Address,
		call: DepositCall,
	) -> Result<SubmissionHandle, VerifierError> {
		self.ensure_sender(from)?;
		let sig = call.signature;
		let pending = self
			.bank
			.permitDeposit(call.value, call.deadline, sig.v, sig.r, sig.s)
			.from(from)
			.send()
			.await
			.map_err(map_send_error)?;

		let handle = SubmissionHandle(*pending.tx_hash());
		tracing::info!(tx_hash = %handle, owner = %from, "Submitted permitDeposit");
		Ok(handle)
	}

	async fn submit_purchase(
		&self,
		from: Address,
		call: PurchaseCall,
	) -> Result<SubmissionHandle, VerifierError> {
		self.ensure_sender(from)?;
		let sig = call.signature;
		let pending = self
			.market
			.permitBuy(call.token_id, call.deadline, sig.v, sig.r, sig.s)
			.from(from)
			.send()
			.await
			.map_err(map_send_error)?;

		let handle = SubmissionHandle(*pending.tx_hash());
		tracing::info!(tx_hash = %handle, buyer = %from, token_id = %call.token_id, "Submitted permitBuy");
		Ok(handle)
	}

	async fn outcome(&self, handle: &SubmissionHandle) -> Result<SubmissionOutcome, VerifierError> {
		let receipt = self
			.provider
			.get_transaction_receipt(handle.0)
			.await
			.map_err(|e| VerifierError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(match receipt {
			None => SubmissionOutcome::Pending,
			Some(receipt) if receipt.status() => SubmissionOutcome::Confirmed,
			Some(_) => SubmissionOutcome::Rejected(RejectionReason::Other(
				"transaction reverted on-chain".to_string(),
			)),
		})
	}
}

/// Builds an [`RpcVerifier`] from `[verifier.implementations.rpc]`.
///
/// - `rpc_url` (required)
/// - `poll_interval_ms` (optional, default 1000)
pub fn create_verifier(
	config: &toml::Value,
	contracts: &ContractDeployment,
	private_key: Option<&SecretString>,
) -> Result<Box<dyn crate::VerifierInterface>, VerifierError> {
	RpcVerifierSchema::validate_config(config)
		.map_err(|e| VerifierError::Configuration(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| VerifierError::Configuration("rpc_url is required".to_string()))?;
	let poll_interval = config
		.get("poll_interval_ms")
		.and_then(|v| v.as_integer())
		.map(|ms| Duration::from_millis(ms as u64))
		.unwrap_or(Duration::from_secs(1));

	let signer = private_key
		.map(|key| {
			key.with_exposed(|k| k.parse::<PrivateKeySigner>())
				.map_err(|_| VerifierError::Configuration("Invalid private key format".to_string()))
		})
		.transpose()?;

	Ok(Box::new(RpcVerifier::new(
		rpc_url,
		contracts,
		signer,
		poll_interval,
	)?))
}

pub struct Registry;

impl permit_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "rpc";
	type Factory = crate::VerifierFactory;

	fn factory() -> Self::Factory {
		create_verifier
	}
}

impl crate::VerifierRegistry for Registry {}
