//! Generic EIP-712 utilities shared across the permit crates.
//!
//! These helpers provide:
//! - Domain hash computation for the four-field domain used by both contracts
//! - Final digest computation (0x1901 || domainHash || structHash)
//! - A minimal ABI encoder for the static EIP-712 field types the permits use

use alloy::primitives::{keccak256, Address, B256, U256};

/// Domain type string. Field order matches the OpenZeppelin `EIP712` base contract.
pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
/// ERC-2612 permit consumed by the token bank's `permitDeposit`.
pub const PERMIT_TYPE: &str =
	"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";
/// Issuer-signed purchase permit consumed by the market's `permitBuy`.
pub const PERMIT_BUY_TYPE: &str = "PermitBuy(address buyer,uint256 tokenId,uint256 deadline)";

/// Compute EIP-712 domain hash
/// (keccak256(abi.encode(typeHash, nameHash, versionHash, chainId, verifyingContract))).
pub fn compute_domain_hash(
	name: &str,
	version: &str,
	chain_id: u64,
	verifying_contract: &Address,
) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
	enc.push_string(name);
	enc.push_string(version);
	enc.push_u256(U256::from(chain_id));
	enc.push_address(verifying_contract);
	keccak256(enc.finish())
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for static types used in EIP-712 struct hashing.
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Default for Eip712AbiEncoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self {
			buf: Vec::with_capacity(32 * 6),
		}
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	/// Dynamic `string` members are encoded as the keccak256 of their UTF-8 bytes.
	pub fn push_string(&mut self, s: &str) {
		self.push_b256(&keccak256(s.as_bytes()));
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{address, b256};

	#[test]
	fn test_address_is_left_padded() {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_address(&address!("0x00000000000000000000000000000000000000ff"));
		let word = enc.finish();
		assert_eq!(word.len(), 32);
		assert!(word[..31].iter().all(|b| *b == 0));
		assert_eq!(word[31], 0xff);
	}

	#[test]
	fn test_final_digest_prefix() {
		let domain = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
		let data = b256!("0x2222222222222222222222222222222222222222222222222222222222222222");
		let mut expected = vec![0x19, 0x01];
		expected.extend_from_slice(domain.as_slice());
		expected.extend_from_slice(data.as_slice());
		assert_eq!(compute_final_digest(&domain, &data), keccak256(expected));
	}

	#[test]
	fn test_domain_hash_depends_on_version() {
		let contract = address!("0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9");
		assert_ne!(
			compute_domain_hash("HTToken", "1", 31337, &contract),
			compute_domain_hash("HTToken", "2", 31337, &contract)
		);
	}
}
