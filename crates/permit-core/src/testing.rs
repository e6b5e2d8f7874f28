use alloy::primitives::{address, Address, U256};
use async_trait::async_trait;
use mockall::mock;
use permit_account::implementations::local::LocalSigner;
use permit_account::AccountService;
use permit_types::{ConfigSchema, ContractDeployment, Listing, NamedContract, SecretString};
use permit_verifier::{
	DepositCall, PurchaseCall, SubmissionHandle, SubmissionOutcome, VerifierError,
	VerifierInterface,
};
use std::sync::Arc;

// Anvil account #0.
pub(crate) const ISSUER_KEY: &str =
	"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub(crate) const ISSUER_ADDRESS: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

mock! {
	pub Verifier {}

	#[async_trait]
	impl VerifierInterface for Verifier {
		fn config_schema(&self) -> Box<dyn ConfigSchema>;
		async fn chain_id(&self) -> Result<u64, VerifierError>;
		async fn timestamp(&self) -> Result<u64, VerifierError>;
		async fn nonce(&self, owner: Address) -> Result<U256, VerifierError>;
		async fn is_whitelisted(&self, account: Address) -> Result<bool, VerifierError>;
		async fn listings(&self) -> Result<Vec<Listing>, VerifierError>;
		async fn deposited(&self, owner: Address) -> Result<U256, VerifierError>;
		async fn submit_deposit(
			&self,
			from: Address,
			call: DepositCall,
		) -> Result<SubmissionHandle, VerifierError>;
		async fn submit_purchase(
			&self,
			from: Address,
			call: PurchaseCall,
		) -> Result<SubmissionHandle, VerifierError>;
		async fn outcome(&self, handle: &SubmissionHandle) -> Result<SubmissionOutcome, VerifierError>;
	}
}

pub(crate) fn contracts() -> ContractDeployment {
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

pub(crate) fn account_with_key(key: &str) -> Arc<AccountService> {
	let signer = LocalSigner::new(SecretString::from(key)).unwrap();
	Arc::new(AccountService::new(Box::new(signer)))
}

pub(crate) fn account() -> Arc<AccountService> {
	account_with_key(ISSUER_KEY)
}
