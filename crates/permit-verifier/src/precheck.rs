//! Client-side pre-check of permit artifacts.
//!
//! Recovers the signer and compares the permit against freshly read chain
//! state. The result is advisory: a clean report does not mean the contract
//! will accept the permit, since the nonce or whitelist may change before the
//! transaction lands. Only the contract's verdict counts.

use crate::{VerifierError, VerifierInterface};
use alloy::primitives::{Address, U256};
use permit_types::{ContractDeployment, DepositPermitArtifact, PurchasePermitArtifact};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
	Expired { deadline: U256, now: u64 },
	/// The permit was signed over a nonce the owner no longer has.
	NonceMismatch { signed: U256, current: U256 },
	/// The permit names a spender other than the bank.
	WrongSpender { spender: Address, bank: Address },
	SignerMismatch { expected: Address, recovered: Address },
	SignerNotWhitelisted { recovered: Address },
	/// No signer could be recovered.
	InvalidSignature { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecheckReport {
	pub chain_id: u64,
	pub recovered_signer: Option<Address>,
	pub findings: Vec<Finding>,
}

impl PrecheckReport {
	/// No problem found. The contract may still reject.
	pub fn is_clean(&self) -> bool {
		self.findings.is_empty()
	}
}

fn check_deadline(deadline: U256, now: u64, findings: &mut Vec<Finding>) {
	if deadline < U256::from(now) {
		findings.push(Finding::Expired { deadline, now });
	}
}

pub async fn precheck_deposit(
	verifier: &dyn VerifierInterface,
	contracts: &ContractDeployment,
	artifact: &DepositPermitArtifact,
) -> Result<PrecheckReport, VerifierError> {
	let chain_id = verifier.chain_id().await?;
	let now = verifier.timestamp().await?;
	let message = artifact.message();
	let digest = message.signing_hash(&contracts.token_domain(chain_id));

	let mut findings = Vec::new();
	check_deadline(artifact.deadline, now, &mut findings);

	if artifact.spender != contracts.bank {
		findings.push(Finding::WrongSpender {
			spender: artifact.spender,
			bank: contracts.bank,
		});
	}

	let current = verifier.nonce(artifact.owner).await?;
	if current != artifact.nonce {
		findings.push(Finding::NonceMismatch {
			signed: artifact.nonce,
			current,
		});
	}

	let recovered_signer = match artifact.signature().recover(&digest) {
		Ok(recovered) => {
			if recovered != artifact.owner {
				findings.push(Finding::SignerMismatch {
					expected: artifact.owner,
					recovered,
				});
			}
			Some(recovered)
		},
		Err(e) => {
			findings.push(Finding::InvalidSignature {
				detail: e.to_string(),
			});
			None
		},
	};

	tracing::debug!(owner = %artifact.owner, findings = findings.len(), "Deposit permit pre-checked");
	Ok(PrecheckReport {
		chain_id,
		recovered_signer,
		findings,
	})
}

pub async fn precheck_purchase(
	verifier: &dyn VerifierInterface,
	contracts: &ContractDeployment,
	artifact: &PurchasePermitArtifact,
) -> Result<PrecheckReport, VerifierError> {
	let chain_id = verifier.chain_id().await?;
	let now = verifier.timestamp().await?;
	let digest = artifact
		.message()
		.signing_hash(&contracts.market_domain(chain_id));

	let mut findings = Vec::new();
	check_deadline(artifact.deadline, now, &mut findings);

	let recovered_signer = match artifact.signature().recover(&digest) {
		Ok(recovered) => {
			if !verifier.is_whitelisted(recovered).await? {
				findings.push(Finding::SignerNotWhitelisted { recovered });
			}
			Some(recovered)
		},
		Err(e) => {
			findings.push(Finding::InvalidSignature {
				detail: e.to_string(),
			});
			None
		},
	};

	tracing::debug!(buyer = %artifact.buyer, findings = findings.len(), "Purchase permit pre-checked");
	Ok(PrecheckReport {
		chain_id,
		recovered_signer,
		findings,
	})
}
