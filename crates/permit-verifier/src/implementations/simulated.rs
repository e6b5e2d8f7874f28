//! In-memory stand-in for the token, bank and market contracts.
//!
//! Implements the consuming entry points with the same rules the deployed
//! contracts apply: rebuild the digest from the call arguments and the sender,
//! recover the signer, check `deadline >= block.timestamp`, then either bump
//! the owner's nonce (deposit) or set the permit's used-marker (purchase).
//! Every check and its state change happen under one write lock, so a permit
//! can never be verified by two submissions.
//!
//! Block time follows the wall clock unless pinned with
//! [`SimulatedContracts::set_timestamp`].

use crate::{
	DepositCall, PurchaseCall, RejectionReason, SubmissionHandle, SubmissionOutcome,
	VerifierError, VerifierInterface,
};
use alloy::primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use permit_types::utils::u256_serde;
use permit_types::{
	build_permit_buy_message, build_permit_message, current_timestamp, ConfigSchema,
	ContractDeployment, Field, FieldType, Listing, Schema, SecretString, SignatureParts,
	ValidationError,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_CHAIN_ID: u64 = 31337;

#[derive(Default)]
struct ChainState {
	pinned_timestamp: Option<u64>,
	nonces: HashMap<Address, U256>,
	/// Digests of consumed purchase permits.
	used: HashSet<B256>,
	whitelist: HashSet<Address>,
	listings: Vec<Listing>,
	deposits: HashMap<Address, U256>,
	outcomes: HashMap<B256, SubmissionOutcome>,
	submissions: u64,
}

impl ChainState {
	fn now(&self) -> u64 {
		self.pinned_timestamp.unwrap_or_else(current_timestamp)
	}

	fn record(&mut self, outcome: SubmissionOutcome) -> SubmissionHandle {
		self.submissions += 1;
		let hash = keccak256(self.submissions.to_be_bytes());
		self.outcomes.insert(hash, outcome);
		SubmissionHandle(hash)
	}
}

fn recover_or_reject(signature: &SignatureParts, digest: &B256) -> Result<Address, RejectionReason> {
	signature
		.recover(digest)
		.map_err(|_| RejectionReason::UnauthorizedSigner)
}

#[derive(Clone)]
pub struct SimulatedContracts {
	chain_id: u64,
	contracts: ContractDeployment,
	state: Arc<RwLock<ChainState>>,
}

impl SimulatedContracts {
	pub fn new(chain_id: u64, contracts: ContractDeployment) -> Self {
		Self {
			chain_id,
			contracts,
			state: Arc::new(RwLock::new(ChainState::default())),
		}
	}

	pub async fn add_to_whitelist(&self, account: Address) {
		self.state.write().await.whitelist.insert(account);
	}

	pub async fn remove_from_whitelist(&self, account: Address) {
		self.state.write().await.whitelist.remove(&account);
	}

	/// Lists `token_id` for sale, replacing any earlier listing of it.
	pub async fn list(&self, token_id: U256, seller: Address, price: U256) {
		let mut state = self.state.write().await;
		state.listings.retain(|l| l.token_id != token_id);
		state.listings.push(Listing {
			token_id,
			seller,
			price,
			active: true,
		});
	}

	/// Pins block time.
	pub async fn set_timestamp(&self, timestamp: u64) {
		self.state.write().await.pinned_timestamp = Some(timestamp);
	}

	fn execute_deposit(
		&self,
		state: &mut ChainState,
		owner: Address,
		call: &DepositCall,
	) -> Result<(), RejectionReason> {
		if U256::from(state.now()) > call.deadline {
			return Err(RejectionReason::Expired);
		}

		let nonce = state.nonces.get(&owner).copied().unwrap_or_default();
		let message = build_permit_message(owner, self.contracts.bank, call.value, nonce, call.deadline);
		let digest = message.signing_hash(&self.contracts.token_domain(self.chain_id));
		let signer = recover_or_reject(&call.signature, &digest)?;
		if signer != owner {
			return Err(RejectionReason::UnauthorizedSigner);
		}

		let overflow = || RejectionReason::Other("arithmetic overflow".to_string());
		let next_nonce = nonce.checked_add(U256::from(1)).ok_or_else(overflow)?;
		let balance = state
			.deposits
			.get(&owner)
			.copied()
			.unwrap_or_default()
			.checked_add(call.value)
			.ok_or_else(overflow)?;

		state.nonces.insert(owner, next_nonce);
		state.deposits.insert(owner, balance);
		Ok(())
	}

	fn execute_purchase(
		&self,
		state: &mut ChainState,
		buyer: Address,
		call: &PurchaseCall,
	) -> Result<(), RejectionReason> {
		if U256::from(state.now()) > call.deadline {
			return Err(RejectionReason::Expired);
		}

		let message = build_permit_buy_message(buyer, call.token_id, call.deadline);
		let digest = message.signing_hash(&self.contracts.market_domain(self.chain_id));
		if state.used.contains(&digest) {
			return Err(RejectionReason::AlreadyConsumed);
		}

		let signer = recover_or_reject(&call.signature, &digest)?;
		if !state.whitelist.contains(&signer) {
			return Err(RejectionReason::UnauthorizedSigner);
		}

		let listing = state
			.listings
			.iter_mut()
			.find(|l| l.token_id == call.token_id && l.active)
			.ok_or_else(|| RejectionReason::Other("NFT not listed".to_string()))?;
		listing.active = false;
		state.used.insert(digest);
		Ok(())
	}
}

#[async_trait]
impl VerifierInterface for SimulatedContracts {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SimulatedSchema)
	}

	async fn chain_id(&self) -> Result<u64, VerifierError> {
		Ok(self.chain_id)
	}

	async fn timestamp(&self) -> Result<u64, VerifierError> {
		Ok(self.state.read().await.now())
	}

	async fn nonce(&self, owner: Address) -> Result<U256, VerifierError> {
		Ok(self
			.state
			.read()
			.await
			.nonces
			.get(&owner)
			.copied()
			.unwrap_or_default())
	}

	async fn is_whitelisted(&self, account: Address) -> Result<bool, VerifierError> {
		Ok(self.state.read().await.whitelist.contains(&account))
	}

	async fn listings(&self) -> Result<Vec<Listing>, VerifierError> {
		Ok(self.state.read().await.listings.clone())
	}

	async fn deposited(&self, owner: Address) -> Result<U256, VerifierError> {
		Ok(self
			.state
			.read()
			.await
			.deposits
			.get(&owner)
			.copied()
			.unwrap_or_default())
	}

	async fn submit_deposit(
		&self,
		from: Address,
		call: DepositCall,
	) -> Result<SubmissionHandle, VerifierError> {
		let mut state = self.state.write().await;
		let outcome = match self.execute_deposit(&mut state, from, &call) {
			Ok(()) => SubmissionOutcome::Confirmed,
			Err(reason) => SubmissionOutcome::Rejected(reason),
		};
		tracing::debug!(owner = %from, value = %call.value, ?outcome, "Simulated permitDeposit");
		Ok(state.record(outcome))
	}

	async fn submit_purchase(
		&self,
		from: Address,
		call: PurchaseCall,
	) -> Result<SubmissionHandle, VerifierError> {
		let mut state = self.state.write().await;
		let outcome = match self.execute_purchase(&mut state, from, &call) {
			Ok(()) => SubmissionOutcome::Confirmed,
			Err(reason) => SubmissionOutcome::Rejected(reason),
		};
		tracing::debug!(buyer = %from, token_id = %call.token_id, ?outcome, "Simulated permitBuy");
		Ok(state.record(outcome))
	}

	async fn outcome(&self, handle: &SubmissionHandle) -> Result<SubmissionOutcome, VerifierError> {
		self.state
			.read()
			.await
			.outcomes
			.get(&handle.0)
			.cloned()
			.ok_or(VerifierError::UnknownSubmission(handle.0))
	}
}

pub struct SimulatedSchema;

impl ConfigSchema for SimulatedSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("chain_id", FieldType::Integer {
					min: Some(1),
					max: None,
				}),
				Field::new("timestamp", FieldType::Integer {
					min: Some(0),
					max: None,
				}),
				Field::new("whitelist", FieldType::Array(Box::new(FieldType::Address))),
				Field::new(
					"listings",
					FieldType::Array(Box::new(FieldType::Table(Schema::new(
						vec![
							Field::new("token_id", FieldType::Uint256),
							Field::new("seller", FieldType::Address),
							Field::new("price", FieldType::Uint256),
						],
						vec![],
					)))),
				),
			],
		);
		schema.validate(config)
	}
}

#[derive(Debug, Deserialize)]
struct SimulatedConfig {
	chain_id: Option<u64>,
	timestamp: Option<u64>,
	#[serde(default)]
	whitelist: Vec<Address>,
	#[serde(default)]
	listings: Vec<ListingSeed>,
}

#[derive(Debug, Deserialize)]
struct ListingSeed {
	#[serde(with = "u256_serde")]
	token_id: U256,
	seller: Address,
	#[serde(with = "u256_serde")]
	price: U256,
}

/// Builds a [`SimulatedContracts`] from `[verifier.implementations.simulated]`.
///
/// - `chain_id` (optional, default 31337)
/// - `timestamp` (optional): pinned block time
/// - `whitelist` (optional): authorized purchase-permit issuers
/// - `[[listings]]` (optional): `token_id`, `seller`, `price`
pub fn create_verifier(
	config: &toml::Value,
	contracts: &ContractDeployment,
	_private_key: Option<&SecretString>,
) -> Result<Box<dyn VerifierInterface>, VerifierError> {
	SimulatedSchema
		.validate(config)
		.map_err(|e| VerifierError::Configuration(e.to_string()))?;
	let seed: SimulatedConfig = config
		.clone()
		.try_into()
		.map_err(|e| VerifierError::Configuration(format!("Invalid simulated config: {}", e)))?;

	let mut state = ChainState {
		pinned_timestamp: seed.timestamp,
		whitelist: seed.whitelist.into_iter().collect(),
		..ChainState::default()
	};
	state.listings = seed
		.listings
		.into_iter()
		.map(|l| Listing {
			token_id: l.token_id,
			seller: l.seller,
			price: l.price,
			active: true,
		})
		.collect();

	Ok(Box::new(SimulatedContracts {
		chain_id: seed.chain_id.unwrap_or(DEFAULT_CHAIN_ID),
		contracts: contracts.clone(),
		state: Arc::new(RwLock::new(state)),
	}))
}

pub struct Registry;

impl permit_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "simulated";
	type Factory = crate::VerifierFactory;

	fn factory() -> Self::Factory {
		create_verifier
	}
}

impl crate::VerifierRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::address;
	use alloy::signers::local::PrivateKeySigner;
	use alloy::signers::SignerSync;
	use permit_types::{decompose, NamedContract};

	const NOW: u64 = 1_700_000_000;

	fn contracts() -> ContractDeployment {
		ContractDeployment {
			token: NamedContract {
				name: "HTToken".to_string(),
				address: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
			},
			bank: address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
			market: NamedContract {
				name: "NFTMarket".to_string(),
				address: address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"),
			},
		}
	}

	async fn chain() -> SimulatedContracts {
		let chain = SimulatedContracts::new(31337, contracts());
		chain.set_timestamp(NOW).await;
		chain
	}

	fn sign(signer: &PrivateKeySigner, digest: B256) -> SignatureParts {
		let signature = signer.sign_hash_sync(&digest).unwrap();
		decompose(&signature.as_bytes()).unwrap()
	}

	fn deposit_call(owner: &PrivateKeySigner, nonce: u64, deadline: u64) -> DepositCall {
		deposit_call_with_value(owner, U256::from(1_000u64), nonce, deadline)
	}

	fn deposit_call_with_value(
		owner: &PrivateKeySigner,
		value: U256,
		nonce: u64,
		deadline: u64,
	) -> DepositCall {
		let message = build_permit_message(
			owner.address(),
			contracts().bank,
			value,
			U256::from(nonce),
			U256::from(deadline),
		);
		let digest = message.signing_hash(&contracts().token_domain(31337));
		DepositCall {
			value,
			deadline: U256::from(deadline),
			signature: sign(owner, digest),
		}
	}

	fn purchase_call(issuer: &PrivateKeySigner, buyer: Address, token_id: u64) -> PurchaseCall {
		let deadline = U256::from(NOW + 3600);
		let message = build_permit_buy_message(buyer, U256::from(token_id), deadline);
		let digest = message.signing_hash(&contracts().market_domain(31337));
		PurchaseCall {
			token_id: U256::from(token_id),
			deadline,
			signature: sign(issuer, digest),
		}
	}

	async fn submit_deposit(
		chain: &SimulatedContracts,
		from: Address,
		call: DepositCall,
	) -> SubmissionOutcome {
		let handle = chain.submit_deposit(from, call).await.unwrap();
		chain.outcome(&handle).await.unwrap()
	}

	async fn submit_purchase(
		chain: &SimulatedContracts,
		from: Address,
		call: PurchaseCall,
	) -> SubmissionOutcome {
		let handle = chain.submit_purchase(from, call).await.unwrap();
		chain.outcome(&handle).await.unwrap()
	}

	#[tokio::test]
	async fn test_deposit_consumes_nonce() {
		let chain = chain().await;
		let owner = PrivateKeySigner::random();
		let call = deposit_call(&owner, 0, NOW + 3600);

		assert_eq!(
			submit_deposit(&chain, owner.address(), call.clone()).await,
			SubmissionOutcome::Confirmed
		);
		assert_eq!(chain.nonce(owner.address()).await.unwrap(), U256::from(1));
		assert_eq!(
			chain.deposited(owner.address()).await.unwrap(),
			U256::from(1_000u64)
		);

		// The same permit now hashes against nonce 1 and recovers a stranger.
		assert_eq!(
			submit_deposit(&chain, owner.address(), call).await,
			SubmissionOutcome::Rejected(RejectionReason::UnauthorizedSigner)
		);
		assert_eq!(chain.nonce(owner.address()).await.unwrap(), U256::from(1));
	}

	#[tokio::test]
	async fn test_deposit_overflow_reverts_without_state_change() {
		let chain = chain().await;
		let owner = PrivateKeySigner::random();
		let full = deposit_call_with_value(&owner, U256::MAX, 0, NOW + 3600);
		assert_eq!(
			submit_deposit(&chain, owner.address(), full).await,
			SubmissionOutcome::Confirmed
		);

		let one_more = deposit_call_with_value(&owner, U256::from(1), 1, NOW + 3600);
		assert_eq!(
			submit_deposit(&chain, owner.address(), one_more).await,
			SubmissionOutcome::Rejected(RejectionReason::Other("arithmetic overflow".to_string()))
		);
		assert_eq!(chain.nonce(owner.address()).await.unwrap(), U256::from(1));
		assert_eq!(chain.deposited(owner.address()).await.unwrap(), U256::MAX);
	}

	#[tokio::test]
	async fn test_deadline_boundary() {
		let chain = chain().await;
		let owner = PrivateKeySigner::random();

		assert_eq!(
			submit_deposit(&chain, owner.address(), deposit_call(&owner, 0, NOW - 1)).await,
			SubmissionOutcome::Rejected(RejectionReason::Expired)
		);
		assert_eq!(
			submit_deposit(&chain, owner.address(), deposit_call(&owner, 0, NOW)).await,
			SubmissionOutcome::Confirmed
		);
	}

	#[tokio::test]
	async fn test_deposit_from_other_sender_rejected() {
		let chain = chain().await;
		let owner = PrivateKeySigner::random();
		let outcome =
			submit_deposit(&chain, Address::repeat_byte(0x42), deposit_call(&owner, 0, NOW + 10))
				.await;
		assert_eq!(
			outcome,
			SubmissionOutcome::Rejected(RejectionReason::UnauthorizedSigner)
		);
	}

	#[tokio::test]
	async fn test_purchase_single_use() {
		let chain = chain().await;
		let issuer = PrivateKeySigner::random();
		let buyer = Address::repeat_byte(0xdd);
		chain.add_to_whitelist(issuer.address()).await;
		chain.list(U256::from(5), Address::repeat_byte(0x11), U256::from(100)).await;

		let call = purchase_call(&issuer, buyer, 5);
		assert_eq!(
			submit_purchase(&chain, buyer, call.clone()).await,
			SubmissionOutcome::Confirmed
		);
		assert_eq!(
			submit_purchase(&chain, buyer, call).await,
			SubmissionOutcome::Rejected(RejectionReason::AlreadyConsumed)
		);
		assert!(!chain.listings().await.unwrap()[0].active);
	}

	#[tokio::test]
	async fn test_purchase_requires_whitelisted_issuer() {
		let chain = chain().await;
		let issuer = PrivateKeySigner::random();
		let buyer = Address::repeat_byte(0xdd);
		chain.list(U256::from(5), Address::repeat_byte(0x11), U256::from(100)).await;

		assert_eq!(
			submit_purchase(&chain, buyer, purchase_call(&issuer, buyer, 5)).await,
			SubmissionOutcome::Rejected(RejectionReason::UnauthorizedSigner)
		);

		chain.add_to_whitelist(issuer.address()).await;
		chain.remove_from_whitelist(issuer.address()).await;
		assert!(!chain.is_whitelisted(issuer.address()).await.unwrap());
	}

	#[tokio::test]
	async fn test_purchase_bound_to_buyer() {
		let chain = chain().await;
		let issuer = PrivateKeySigner::random();
		chain.add_to_whitelist(issuer.address()).await;
		chain.list(U256::from(5), Address::repeat_byte(0x11), U256::from(100)).await;

		let call = purchase_call(&issuer, Address::repeat_byte(0xdd), 5);
		assert_eq!(
			submit_purchase(&chain, Address::repeat_byte(0xee), call).await,
			SubmissionOutcome::Rejected(RejectionReason::UnauthorizedSigner)
		);
	}

	#[tokio::test]
	async fn test_unknown_handle() {
		let chain = chain().await;
		assert!(matches!(
			chain.outcome(&SubmissionHandle(B256::ZERO)).await,
			Err(VerifierError::UnknownSubmission(_))
		));
	}

	#[tokio::test]
	async fn test_factory_seeds_state() {
		let config: toml::Value = toml::from_str(
			r#"
			chain_id = 1337
			timestamp = 1700000000
			whitelist = ["0x70997970C51812dc3A010C7d01b50e0d17dc79C8"]

			[[listings]]
			token_id = 5
			seller = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"
			price = "1000000000000000000"
			"#,
		)
		.unwrap();

		let chain = create_verifier(&config, &contracts(), None).unwrap();
		assert_eq!(chain.chain_id().await.unwrap(), 1337);
		assert_eq!(chain.timestamp().await.unwrap(), NOW);
		assert!(chain
			.is_whitelisted(address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"))
			.await
			.unwrap());

		let listings = chain.listings().await.unwrap();
		assert_eq!(listings.len(), 1);
		assert_eq!(listings[0].token_id, U256::from(5));
		assert_eq!(
			listings[0].price,
			U256::from(1_000_000_000_000_000_000u128)
		);
	}

	#[test]
	fn test_schema_rejects_bad_seeds() {
		let bad_whitelist: toml::Value = toml::from_str(r#"whitelist = ["0x1234"]"#).unwrap();
		assert!(matches!(
			SimulatedSchema.validate(&bad_whitelist),
			Err(ValidationError::InvalidValue { field, .. }) if field == "whitelist[0]"
		));

		let missing_seller: toml::Value = toml::from_str(
			r#"
			[[listings]]
			token_id = 5
			price = "1000"
			"#,
		)
		.unwrap();
		assert_eq!(
			SimulatedSchema.validate(&missing_seller),
			Err(ValidationError::MissingField("listings[0].seller".to_string()))
		);
	}
}
