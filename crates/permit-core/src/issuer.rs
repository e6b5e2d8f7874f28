//! Permit issuance for both protocols.

use crate::PermitError;
use alloy::primitives::{Address, U256};
use permit_account::AccountService;
use permit_config::IssuerConfig;
use permit_types::{
	build_permit_buy_message, build_permit_message, current_timestamp, decompose,
	normalize_recovery_id, ContractDeployment, DepositPermitArtifact, PurchasePermitArtifact,
	SignatureParts, TypedDataRequest, TypedMessage,
};
use permit_verifier::VerifierInterface;
use std::sync::Arc;
use tracing::instrument;

/// Deposit into the bank. The owner is always the signer.
#[derive(Debug, Clone, Default)]
pub struct DepositPermitRequest {
	pub value: Option<U256>,
	/// Unix seconds. Defaults to now plus the configured validity.
	pub deadline: Option<U256>,
}

/// Pre-authorization for `buyer` to purchase `token_id`.
#[derive(Debug, Clone, Default)]
pub struct PurchasePermitRequest {
	pub buyer: Option<Address>,
	pub token_id: Option<U256>,
	pub deadline: Option<U256>,
}

pub struct PermitIssuer {
	account: Arc<AccountService>,
	verifier: Arc<dyn VerifierInterface>,
	contracts: ContractDeployment,
	config: IssuerConfig,
}

impl PermitIssuer {
	pub fn new(
		account: Arc<AccountService>,
		verifier: Arc<dyn VerifierInterface>,
		contracts: ContractDeployment,
		config: IssuerConfig,
	) -> Self {
		Self {
			account,
			verifier,
			contracts,
			config,
		}
	}

	/// Signs an ERC-2612 permit letting the bank pull `value` from the signer.
	///
	/// The nonce is read from the token right before signing. If another
	/// permit for the same owner is consumed first, this one goes stale.
	#[instrument(skip_all)]
	pub async fn issue_deposit_permit(
		&self,
		request: DepositPermitRequest,
	) -> Result<DepositPermitArtifact, PermitError> {
		let value = request
			.value
			.ok_or_else(|| PermitError::IncompleteInput("value is required".to_string()))?;

		let owner = self.account.get_address().await?;
		let chain_id = self.chain_id().await?;
		let nonce = self.verifier.nonce(owner).await?;
		let deadline = self.resolve_deadline(request.deadline);

		let message = build_permit_message(owner, self.contracts.bank, value, nonce, deadline);
		let typed = TypedDataRequest::new(
			self.contracts.token_domain(chain_id),
			TypedMessage::Permit(message.clone()),
		);
		let signature = self.sign(&typed, owner).await?;

		tracing::info!(
			owner = %owner,
			value = %value,
			nonce = %nonce,
			deadline = %deadline,
			"Issued deposit permit"
		);
		Ok(DepositPermitArtifact::new(&message, signature))
	}

	/// Signs a `PermitBuy` for `buyer`. Only useful if the signer is on the
	/// market's whitelist; that is checked by the market, not here.
	#[instrument(skip_all)]
	pub async fn issue_purchase_permit(
		&self,
		request: PurchasePermitRequest,
	) -> Result<PurchasePermitArtifact, PermitError> {
		let buyer = request
			.buyer
			.ok_or_else(|| PermitError::IncompleteInput("buyer is required".to_string()))?;
		let token_id = request
			.token_id
			.ok_or_else(|| PermitError::IncompleteInput("token id is required".to_string()))?;

		let issuer = self.account.get_address().await?;
		let chain_id = self.chain_id().await?;
		let deadline = self.resolve_deadline(request.deadline);

		let message = build_permit_buy_message(buyer, token_id, deadline);
		let typed = TypedDataRequest::new(
			self.contracts.market_domain(chain_id),
			TypedMessage::PermitBuy(message.clone()),
		);
		let signature = self.sign(&typed, issuer).await?;

		tracing::info!(
			issuer = %issuer,
			buyer = %buyer,
			token_id = %token_id,
			deadline = %deadline,
			"Issued purchase permit"
		);
		Ok(PurchasePermitArtifact::new(&message, signature))
	}

	/// Address that signs every permit.
	pub async fn signer_address(&self) -> Result<Address, PermitError> {
		Ok(self.account.get_address().await?)
	}

	async fn chain_id(&self) -> Result<u64, PermitError> {
		let actual = self.verifier.chain_id().await?;
		match self.config.expected_chain_id {
			Some(expected) if expected != actual => {
				Err(PermitError::ChainMismatch { expected, actual })
			},
			_ => Ok(actual),
		}
	}

	fn resolve_deadline(&self, requested: Option<U256>) -> U256 {
		requested.unwrap_or_else(|| {
			U256::from(current_timestamp().saturating_add(self.config.validity_seconds))
		})
	}

	/// Signs, normalizes `v` and checks the signature recovers to `signer`.
	async fn sign(
		&self,
		request: &TypedDataRequest,
		signer: Address,
	) -> Result<SignatureParts, PermitError> {
		let raw = self.account.sign_typed_data(request).await?;
		let parts = decompose(&normalize_recovery_id(raw))?;
		parts.ensure_conventional_v()?;

		let recovered = parts.recover(&request.digest())?;
		if recovered != signer {
			return Err(PermitError::SignerUnavailable(format!(
				"signature recovers to {} instead of {}",
				recovered, signer
			)));
		}
		Ok(parts)
	}
}
