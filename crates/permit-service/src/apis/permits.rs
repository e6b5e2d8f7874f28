//! Purchase-permit issuance, artifact pre-checks and market listings.

use crate::apis::error::ApiError;
use alloy::primitives::{Address, U256};
use permit_core::{PermitError, PermitToolkit, PurchasePermitRequest};
use permit_types::utils::u256_serde;
use permit_types::{DepositPermitArtifact, Listing, PurchasePermitArtifact};
use permit_verifier::precheck::{precheck_deposit, precheck_purchase, PrecheckReport};
use serde::Deserialize;

/// Body of `POST /api/permits/purchase`. Missing fields are reported, not defaulted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePermitBody {
	pub buyer: Option<Address>,
	#[serde(default, with = "u256_serde::option")]
	pub token_id: Option<U256>,
	#[serde(default, with = "u256_serde::option")]
	pub deadline: Option<U256>,
}

/// Body of `POST /api/permits/verify`. Artifacts get the same structural
/// checks as the CLI before any recovery is attempted.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "artifact", rename_all = "snake_case")]
pub enum VerifyBody {
	Deposit(DepositPermitArtifact),
	Purchase(PurchasePermitArtifact),
}

pub async fn issue_purchase_permit(
	body: PurchasePermitBody,
	toolkit: &PermitToolkit,
) -> Result<PurchasePermitArtifact, ApiError> {
	let request = PurchasePermitRequest {
		buyer: body.buyer,
		token_id: body.token_id,
		deadline: body.deadline,
	};
	Ok(toolkit.issuer.issue_purchase_permit(request).await?)
}

pub async fn verify_artifact(
	body: VerifyBody,
	toolkit: &PermitToolkit,
) -> Result<PrecheckReport, ApiError> {
	let verifier = toolkit.verifier.as_ref();
	let report = match body {
		VerifyBody::Deposit(artifact) => {
			artifact.validate().map_err(PermitError::from)?;
			precheck_deposit(verifier, &toolkit.contracts, &artifact).await?
		},
		VerifyBody::Purchase(artifact) => {
			artifact.validate().map_err(PermitError::from)?;
			precheck_purchase(verifier, &toolkit.contracts, &artifact).await?
		},
	};
	Ok(report)
}

pub async fn get_listings(toolkit: &PermitToolkit) -> Result<Vec<Listing>, ApiError> {
	Ok(toolkit.verifier.listings().await?)
}
