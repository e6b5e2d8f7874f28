//! Typed message schemas for the two permit protocols.
//!
//! Field order in the type descriptors is part of the hash input and mirrors
//! the Solidity struct declarations of the verifying contracts.
//!
//! The two schemas deliberately use different replay protection: `Permit`
//! carries the owner's nonce counter, `PermitBuy` carries none and relies on
//! the market contract's used-marker.

use crate::domain::SigningDomain;
use crate::utils::{
	compute_final_digest, u256_serde, Eip712AbiEncoder, PERMIT_BUY_TYPE, PERMIT_TYPE,
};
use alloy::primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One member of an EIP-712 struct type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeField {
	pub name: &'static str,
	#[serde(rename = "type")]
	pub ty: &'static str,
}

impl TypeField {
	pub const fn new(name: &'static str, ty: &'static str) -> Self {
		Self { name, ty }
	}
}

pub const DOMAIN_PRIMARY_TYPE: &str = "EIP712Domain";
pub const PERMIT_PRIMARY_TYPE: &str = "Permit";
pub const PERMIT_BUY_PRIMARY_TYPE: &str = "PermitBuy";

pub const DOMAIN_TYPE_FIELDS: &[TypeField] = &[
	TypeField::new("name", "string"),
	TypeField::new("version", "string"),
	TypeField::new("chainId", "uint256"),
	TypeField::new("verifyingContract", "address"),
];

pub const PERMIT_TYPE_FIELDS: &[TypeField] = &[
	TypeField::new("owner", "address"),
	TypeField::new("spender", "address"),
	TypeField::new("value", "uint256"),
	TypeField::new("nonce", "uint256"),
	TypeField::new("deadline", "uint256"),
];

pub const PERMIT_BUY_TYPE_FIELDS: &[TypeField] = &[
	TypeField::new("buyer", "address"),
	TypeField::new("tokenId", "uint256"),
	TypeField::new("deadline", "uint256"),
];

/// Renders the canonical EIP-712 type string, e.g. `PermitBuy(address buyer,...)`.
pub fn encode_type(primary_type: &str, fields: &[TypeField]) -> String {
	let members = fields
		.iter()
		.map(|f| format!("{} {}", f.ty, f.name))
		.collect::<Vec<_>>()
		.join(",");
	format!("{}({})", primary_type, members)
}

/// ERC-2612 `Permit` message signed by the token owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitMessage {
	pub owner: Address,
	pub spender: Address,
	#[serde(with = "u256_serde")]
	pub value: U256,
	/// Must equal the owner's on-chain nonce when the permit is consumed.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	#[serde(with = "u256_serde")]
	pub deadline: U256,
}

/// Issuer-signed `PermitBuy` message naming the buyer allowed to purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitBuyMessage {
	pub buyer: Address,
	#[serde(with = "u256_serde")]
	pub token_id: U256,
	#[serde(with = "u256_serde")]
	pub deadline: U256,
}

/// Builds a deposit permit message. No range validation happens here.
pub fn build_permit_message(
	owner: Address,
	spender: Address,
	value: U256,
	nonce: U256,
	deadline: U256,
) -> PermitMessage {
	PermitMessage {
		owner,
		spender,
		value,
		nonce,
		deadline,
	}
}

/// Builds a purchase permit message. No range validation happens here.
pub fn build_permit_buy_message(buyer: Address, token_id: U256, deadline: U256) -> PermitBuyMessage {
	PermitBuyMessage {
		buyer,
		token_id,
		deadline,
	}
}

impl PermitMessage {
	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(PERMIT_TYPE.as_bytes()));
		enc.push_address(&self.owner);
		enc.push_address(&self.spender);
		enc.push_u256(self.value);
		enc.push_u256(self.nonce);
		enc.push_u256(self.deadline);
		keccak256(enc.finish())
	}

	pub fn signing_hash(&self, domain: &SigningDomain) -> B256 {
		compute_final_digest(&domain.separator(), &self.struct_hash())
	}
}

impl PermitBuyMessage {
	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&keccak256(PERMIT_BUY_TYPE.as_bytes()));
		enc.push_address(&self.buyer);
		enc.push_u256(self.token_id);
		enc.push_u256(self.deadline);
		keccak256(enc.finish())
	}

	pub fn signing_hash(&self, domain: &SigningDomain) -> B256 {
		compute_final_digest(&domain.separator(), &self.struct_hash())
	}
}

/// Either of the two permit messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedMessage {
	Permit(PermitMessage),
	PermitBuy(PermitBuyMessage),
}

impl TypedMessage {
	pub fn primary_type(&self) -> &'static str {
		match self {
			TypedMessage::Permit(_) => PERMIT_PRIMARY_TYPE,
			TypedMessage::PermitBuy(_) => PERMIT_BUY_PRIMARY_TYPE,
		}
	}

	pub fn type_fields(&self) -> &'static [TypeField] {
		match self {
			TypedMessage::Permit(_) => PERMIT_TYPE_FIELDS,
			TypedMessage::PermitBuy(_) => PERMIT_BUY_TYPE_FIELDS,
		}
	}

	pub fn struct_hash(&self) -> B256 {
		match self {
			TypedMessage::Permit(m) => m.struct_hash(),
			TypedMessage::PermitBuy(m) => m.struct_hash(),
		}
	}

	pub fn signing_hash(&self, domain: &SigningDomain) -> B256 {
		compute_final_digest(&domain.separator(), &self.struct_hash())
	}

	fn message_json(&self) -> Value {
		match self {
			TypedMessage::Permit(m) => json!({
				"owner": m.owner.to_checksum(None),
				"spender": m.spender.to_checksum(None),
				"value": m.value.to_string(),
				"nonce": m.nonce.to_string(),
				"deadline": m.deadline.to_string(),
			}),
			TypedMessage::PermitBuy(m) => json!({
				"buyer": m.buyer.to_checksum(None),
				"tokenId": m.token_id.to_string(),
				"deadline": m.deadline.to_string(),
			}),
		}
	}
}

/// Everything a key custodian needs to produce a typed-data signature:
/// domain, type descriptor, primary type name and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDataRequest {
	pub domain: SigningDomain,
	pub message: TypedMessage,
}

impl TypedDataRequest {
	pub fn new(domain: SigningDomain, message: TypedMessage) -> Self {
		Self { domain, message }
	}

	pub fn primary_type(&self) -> &'static str {
		self.message.primary_type()
	}

	pub fn types(&self) -> &'static [TypeField] {
		self.message.type_fields()
	}

	/// The 32-byte EIP-712 digest to be signed.
	pub fn digest(&self) -> B256 {
		self.message.signing_hash(&self.domain)
	}

	/// Renders the request in `eth_signTypedData_v4` JSON shape.
	pub fn to_payload(&self) -> Value {
		let mut types = Map::new();
		types.insert(
			DOMAIN_PRIMARY_TYPE.to_string(),
			json!(DOMAIN_TYPE_FIELDS),
		);
		types.insert(self.primary_type().to_string(), json!(self.types()));

		json!({
			"types": types,
			"primaryType": self.primary_type(),
			"domain": {
				"name": self.domain.name,
				"version": self.domain.version,
				"chainId": self.domain.chain_id,
				"verifyingContract": self.domain.verifying_contract.to_checksum(None),
			},
			"message": self.message.message_json(),
		})
	}
}

/// `sol!` mirrors of the on-chain structs, used to cross-check the
/// hand-rolled encoder against alloy's derived EIP-712 hashing.
pub mod sol_structs {
	alloy::sol! {
		struct Permit {
			address owner;
			address spender;
			uint256 value;
			uint256 nonce;
			uint256 deadline;
		}

		struct PermitBuy {
			address buyer;
			uint256 tokenId;
			uint256 deadline;
		}
	}

	impl From<&super::PermitMessage> for Permit {
		fn from(m: &super::PermitMessage) -> Self {
			Self {
				owner: m.owner,
				spender: m.spender,
				value: m.value,
				nonce: m.nonce,
				deadline: m.deadline,
			}
		}
	}

	impl From<&super::PermitBuyMessage> for PermitBuy {
		fn from(m: &super::PermitBuyMessage) -> Self {
			Self {
				buyer: m.buyer,
				tokenId: m.token_id,
				deadline: m.deadline,
			}
		}
	}
}
