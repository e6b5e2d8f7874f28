//! Permit submission and outcome tracking.
//!
//! Submits a signed artifact to its consuming entry point and polls the
//! verifier until the transaction is confirmed, rejected or the wait times
//! out. A rejection is final; resubmitting the same artifact cannot succeed
//! once the contract has refused it or consumed it.

use crate::PermitError;
use alloy::primitives::Address;
use permit_types::{truncate_hex, DepositPermitArtifact, PurchasePermitArtifact};
use permit_verifier::{
	DepositCall, PurchaseCall, RejectionReason, SubmissionHandle, SubmissionOutcome,
	VerifierError, VerifierInterface,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub struct PermitSubmitter {
	verifier: Arc<dyn VerifierInterface>,
	poll_interval: Duration,
	timeout: Duration,
}

impl PermitSubmitter {
	pub fn new(verifier: Arc<dyn VerifierInterface>, poll_interval: Duration, timeout: Duration) -> Self {
		Self {
			verifier,
			poll_interval,
			timeout,
		}
	}

	/// Sends `permitDeposit` from `from` and waits for the verdict.
	///
	/// The bank treats the sender as the permit owner, so `from` should match
	/// `artifact.owner`; a mismatch is left for the contract to reject.
	#[instrument(skip_all, fields(owner = %artifact.owner, nonce = %artifact.nonce))]
	pub async fn submit_deposit(
		&self,
		from: Address,
		artifact: &DepositPermitArtifact,
	) -> Result<SubmissionHandle, PermitError> {
		let signature = artifact.signature();
		signature.ensure_conventional_v()?;
		if from != artifact.owner {
			tracing::warn!(from = %from, "Sender is not the permit owner");
		}

		let call = DepositCall {
			value: artifact.value,
			deadline: artifact.deadline,
			signature,
		};
		let handle = match self.verifier.submit_deposit(from, call).await {
			Ok(handle) => handle,
			Err(VerifierError::Rejected(reason)) => {
				return Err(self.deposit_rejected(reason, artifact).await)
			},
			Err(e) => return Err(e.into()),
		};

		match self.await_outcome(handle).await? {
			Verdict::Confirmed => Ok(handle),
			Verdict::Rejected(reason) => Err(self.deposit_rejected(reason, artifact).await),
		}
	}

	/// Sends `permitBuy` from `from`, who must be the buyer the permit names.
	#[instrument(skip_all, fields(buyer = %artifact.buyer, token_id = %artifact.token_id))]
	pub async fn submit_purchase(
		&self,
		from: Address,
		artifact: &PurchasePermitArtifact,
	) -> Result<SubmissionHandle, PermitError> {
		let signature = artifact.signature();
		signature.ensure_conventional_v()?;
		if from != artifact.buyer {
			tracing::warn!(from = %from, "Sender is not the permit buyer");
		}

		let call = PurchaseCall {
			token_id: artifact.token_id,
			deadline: artifact.deadline,
			signature,
		};
		let handle = match self.verifier.submit_purchase(from, call).await {
			Ok(handle) => handle,
			Err(VerifierError::Rejected(reason)) => return Err(purchase_rejected(reason)),
			Err(e) => return Err(e.into()),
		};

		match self.await_outcome(handle).await? {
			Verdict::Confirmed => Ok(handle),
			Verdict::Rejected(reason) => Err(purchase_rejected(reason)),
		}
	}

	/// Polls until the submission leaves `Pending` or the timeout elapses.
	async fn await_outcome(&self, handle: SubmissionHandle) -> Result<Verdict, PermitError> {
		let start = tokio::time::Instant::now();

		loop {
			match self.verifier.outcome(&handle).await {
				Ok(SubmissionOutcome::Confirmed) => {
					tracing::info!(tx_hash = %truncate_hex(&handle.to_string()), "Confirmed");
					return Ok(Verdict::Confirmed);
				},
				Ok(SubmissionOutcome::Rejected(reason)) => return Ok(Verdict::Rejected(reason)),
				Ok(SubmissionOutcome::Pending) => {
					tracing::debug!(
						tx_hash = %truncate_hex(&handle.to_string()),
						elapsed_secs = start.elapsed().as_secs(),
						"Waiting for transaction to be mined"
					);
				},
				Err(VerifierError::Network(e)) => {
					tracing::debug!(error = %e, "Checking transaction status");
				},
				Err(e) => return Err(e.into()),
			}

			if start.elapsed() >= self.timeout {
				tracing::warn!(
					tx_hash = %handle,
					"Transaction monitoring timeout reached after {} seconds",
					self.timeout.as_secs()
				);
				return Err(PermitError::Timeout {
					handle,
					seconds: self.timeout.as_secs(),
				});
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}

	/// The token reports a stale nonce the same way as a bad signature: the
	/// recovered signer does not match the owner. Tell them apart by reading
	/// the owner's nonce after the fact.
	async fn deposit_rejected(
		&self,
		reason: RejectionReason,
		artifact: &DepositPermitArtifact,
	) -> PermitError {
		let reason = match reason {
			RejectionReason::UnauthorizedSigner => match self.verifier.nonce(artifact.owner).await {
				Ok(current) if current != artifact.nonce => {
					tracing::debug!(signed = %artifact.nonce, current = %current, "Permit nonce is stale");
					RejectionReason::StaleNonce
				},
				_ => RejectionReason::UnauthorizedSigner,
			},
			other => other,
		};
		tracing::warn!(reason = %reason, "Deposit permit rejected");
		PermitError::Rejected(reason)
	}
}

fn purchase_rejected(reason: RejectionReason) -> PermitError {
	tracing::warn!(reason = %reason, "Purchase permit rejected");
	PermitError::Rejected(reason)
}

enum Verdict {
	Confirmed,
	Rejected(RejectionReason),
}
