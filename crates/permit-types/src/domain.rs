//! EIP-712 signing domains.
//!
//! A [`SigningDomain`] binds a signature to one contract on one chain. It must
//! match the domain hard-coded in the verifying contract byte for byte, string
//! casing included; a mismatch is not detectable at signing time and only
//! surfaces as a rejected permit.

use crate::utils::compute_domain_hash;
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::Eip712Domain;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Version string shared by every domain this toolkit signs under.
pub const DOMAIN_VERSION: &str = "1";

/// The canonical per-contract, per-chain signing domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningDomain {
	pub name: String,
	pub version: String,
	pub chain_id: u64,
	pub verifying_contract: Address,
}

/// Builds the signing domain for a verifying contract.
///
/// `chain_id` must be the chain the key custodian is connected to at signing
/// time; callers read it fresh rather than caching it.
pub fn build_domain(chain_id: u64, contract_address: Address, contract_name: &str) -> SigningDomain {
	SigningDomain {
		name: contract_name.to_string(),
		version: DOMAIN_VERSION.to_string(),
		chain_id,
		verifying_contract: contract_address,
	}
}

impl SigningDomain {
	/// The EIP-712 domain separator.
	pub fn separator(&self) -> B256 {
		compute_domain_hash(
			&self.name,
			&self.version,
			self.chain_id,
			&self.verifying_contract,
		)
	}

	/// Converts to alloy's domain representation.
	pub fn to_eip712(&self) -> Eip712Domain {
		Eip712Domain {
			name: Some(Cow::Owned(self.name.clone())),
			version: Some(Cow::Owned(self.version.clone())),
			chain_id: Some(U256::from(self.chain_id)),
			verifying_contract: Some(self.verifying_contract),
			salt: None,
		}
	}
}
