//! Issuing and submitting EIP-712 permits.
//!
//! [`PermitIssuer`] turns a request into a signed artifact: it reads the live
//! chain id and nonce, builds the typed message, asks the signing capability
//! and decomposes the result. [`PermitSubmitter`] hands an artifact to the
//! verifying contract and waits for its verdict. Neither retries: a declined
//! signature or a rejected permit goes back to the caller as is.

use permit_account::AccountError;
use permit_types::{ArtifactError, CodecError};
use permit_verifier::{RejectionReason, SubmissionHandle, VerifierError};
use thiserror::Error;

pub mod builder;
pub mod issuer;
pub mod submitter;
#[cfg(test)]
pub(crate) mod testing;

pub use builder::{PermitBuilder, PermitFactories, PermitToolkit};
pub use issuer::{DepositPermitRequest, PermitIssuer, PurchasePermitRequest};
pub use submitter::PermitSubmitter;

#[derive(Debug, Error)]
pub enum PermitError {
	/// A required request field is missing. Raised before any external call.
	#[error("Incomplete input: {0}")]
	IncompleteInput(String),
	#[error("Signing declined: {0}")]
	SigningDeclined(String),
	#[error("Signer unavailable: {0}")]
	SignerUnavailable(String),
	/// The verifying contract refused the permit.
	#[error("Permit rejected: {0}")]
	Rejected(RejectionReason),
	#[error(transparent)]
	MalformedArtifact(#[from] ArtifactError),
	#[error("Invalid signature: {0}")]
	Codec(#[from] CodecError),
	#[error("Connected to chain {actual}, expected {expected}")]
	ChainMismatch { expected: u64, actual: u64 },
	#[error("No outcome for submission {handle} after {seconds}s")]
	Timeout {
		handle: SubmissionHandle,
		seconds: u64,
	},
	#[error("Verifier error: {0}")]
	Verifier(VerifierError),
	#[error("Configuration error: {0}")]
	Config(String),
}

impl From<AccountError> for PermitError {
	fn from(e: AccountError) -> Self {
		match e {
			AccountError::Declined(reason) => PermitError::SigningDeclined(reason),
			AccountError::Unavailable(reason) | AccountError::SigningFailed(reason) => {
				PermitError::SignerUnavailable(reason)
			},
			AccountError::InvalidKey(reason) => PermitError::Config(reason),
		}
	}
}

impl From<VerifierError> for PermitError {
	fn from(e: VerifierError) -> Self {
		match e {
			VerifierError::Rejected(reason) => PermitError::Rejected(reason),
			other => PermitError::Verifier(other),
		}
	}
}

impl PermitError {
	/// Whether the caller may reasonably try again with the same input.
	///
	/// A declined signature or a network failure may clear up. A rejected
	/// permit never will: it needs a fresh signature.
	pub fn is_recoverable(&self) -> bool {
		matches!(
			self,
			PermitError::SigningDeclined(_)
				| PermitError::SignerUnavailable(_)
				| PermitError::Timeout { .. }
				| PermitError::Verifier(VerifierError::Network(_))
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rejection_passes_through() {
		let err: PermitError = VerifierError::Rejected(RejectionReason::Expired).into();
		assert!(matches!(err, PermitError::Rejected(RejectionReason::Expired)));
		assert!(!err.is_recoverable());

		let err: PermitError = VerifierError::Network("timeout".to_string()).into();
		assert!(err.is_recoverable());
	}

	#[test]
	fn test_declined_is_recoverable() {
		let err: PermitError = AccountError::Declined("no".to_string()).into();
		assert!(matches!(err, PermitError::SigningDeclined(_)));
		assert!(err.is_recoverable());
	}
}
