//! Addresses and EIP-712 names of the deployed contracts.

use crate::domain::{build_domain, SigningDomain};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// A verifying contract: its domain name and deployed address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedContract {
	/// Must match the `name` in the contract's EIP-712 domain, casing included.
	pub name: String,
	pub address: Address,
}

/// The three contracts the permit flows touch.
///
/// `token` verifies deposit permits and owns the nonce counter, `bank` is the
/// permit spender and the deposit entry point, `market` verifies purchase
/// permits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDeployment {
	pub token: NamedContract,
	pub bank: Address,
	pub market: NamedContract,
}

impl ContractDeployment {
	pub fn token_domain(&self, chain_id: u64) -> SigningDomain {
		build_domain(chain_id, self.token.address, &self.token.name)
	}

	pub fn market_domain(&self, chain_id: u64) -> SigningDomain {
		build_domain(chain_id, self.market.address, &self.market.name)
	}
}
