//! Permit artifacts: the signed records handed from signer to submitter.
//!
//! An artifact carries every message field plus `(v, r, s)`, enough for a
//! verifier to rebuild the digest and recover the signer without any other
//! context. Purchase artifacts keep the JSON layout the issuing tool has
//! always emitted (`tokenId`, `deadline`, `v`, `r`, `s`, `buyer`), so they can
//! be copied between parties as plain text. 256-bit integers are written as
//! decimal strings.

use crate::message::{PermitBuyMessage, PermitMessage};
use crate::signature::SignatureParts;
use crate::utils::u256_serde;
use alloy::primitives::{Address, B256, U256};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing or rendering artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
	/// The input is not a structurally valid artifact.
	#[error("Malformed permit artifact: {0}")]
	Malformed(String),
	/// Rendering failed.
	#[error("Failed to serialize permit artifact: {0}")]
	Serialization(String),
}

/// Signed ERC-2612 deposit permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DepositPermitArtifact {
	pub owner: Address,
	pub spender: Address,
	#[serde(with = "u256_serde")]
	pub value: U256,
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	#[serde(with = "u256_serde")]
	pub deadline: U256,
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

/// Signed purchase permit issued by a whitelisted authority for one buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PurchasePermitArtifact {
	#[serde(with = "u256_serde")]
	pub token_id: U256,
	#[serde(with = "u256_serde")]
	pub deadline: U256,
	pub v: u8,
	pub r: B256,
	pub s: B256,
	pub buyer: Address,
}

impl DepositPermitArtifact {
	pub fn new(message: &PermitMessage, signature: SignatureParts) -> Self {
		Self {
			owner: message.owner,
			spender: message.spender,
			value: message.value,
			nonce: message.nonce,
			deadline: message.deadline,
			v: signature.v,
			r: signature.r,
			s: signature.s,
		}
	}

	pub fn message(&self) -> PermitMessage {
		PermitMessage {
			owner: self.owner,
			spender: self.spender,
			value: self.value,
			nonce: self.nonce,
			deadline: self.deadline,
		}
	}

	pub fn signature(&self) -> SignatureParts {
		SignatureParts {
			v: self.v,
			r: self.r,
			s: self.s,
		}
	}

	pub fn from_json(input: &str) -> Result<Self, ArtifactError> {
		let artifact: Self = parse_json(input)?;
		artifact.validate()?;
		Ok(artifact)
	}

	/// Structural checks applied to every artifact before any recovery.
	pub fn validate(&self) -> Result<(), ArtifactError> {
		check_recovery_id(self.v)
	}

	pub fn to_json_pretty(&self) -> Result<String, ArtifactError> {
		serde_json::to_string_pretty(self).map_err(|e| ArtifactError::Serialization(e.to_string()))
	}
}

impl PurchasePermitArtifact {
	pub fn new(message: &PermitBuyMessage, signature: SignatureParts) -> Self {
		Self {
			token_id: message.token_id,
			deadline: message.deadline,
			v: signature.v,
			r: signature.r,
			s: signature.s,
			buyer: message.buyer,
		}
	}

	pub fn message(&self) -> PermitBuyMessage {
		PermitBuyMessage {
			buyer: self.buyer,
			token_id: self.token_id,
			deadline: self.deadline,
		}
	}

	pub fn signature(&self) -> SignatureParts {
		SignatureParts {
			v: self.v,
			r: self.r,
			s: self.s,
		}
	}

	pub fn from_json(input: &str) -> Result<Self, ArtifactError> {
		let artifact: Self = parse_json(input)?;
		artifact.validate()?;
		Ok(artifact)
	}

	/// Structural checks applied to every artifact before any recovery.
	pub fn validate(&self) -> Result<(), ArtifactError> {
		check_recovery_id(self.v)
	}

	pub fn to_json_pretty(&self) -> Result<String, ArtifactError> {
		serde_json::to_string_pretty(self).map_err(|e| ArtifactError::Serialization(e.to_string()))
	}
}

fn parse_json<T: DeserializeOwned>(input: &str) -> Result<T, ArtifactError> {
	if input.trim().is_empty() {
		return Err(ArtifactError::Malformed("empty input".to_string()));
	}
	serde_json::from_str(input).map_err(|e| ArtifactError::Malformed(e.to_string()))
}

fn check_recovery_id(v: u8) -> Result<(), ArtifactError> {
	match v {
		27 | 28 => Ok(()),
		other => Err(ArtifactError::Malformed(format!(
			"field `v` must be 27 or 28, got {}",
			other
		))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::message::build_permit_buy_message;
	use alloy::primitives::address;

	const BUYER: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

	fn signature() -> SignatureParts {
		SignatureParts {
			v: 28,
			r: B256::repeat_byte(0xaa),
			s: B256::repeat_byte(0xbb),
		}
	}

	#[test]
	fn test_purchase_artifact_layout() {
		let message = build_permit_buy_message(BUYER, U256::from(5), U256::from(1_700_003_600u64));
		let artifact = PurchasePermitArtifact::new(&message, signature());
		let json: serde_json::Value =
			serde_json::from_str(&artifact.to_json_pretty().unwrap()).unwrap();

		assert_eq!(json["tokenId"], "5");
		assert_eq!(json["deadline"], "1700003600");
		assert_eq!(json["v"], 28);
		assert_eq!(json["buyer"], format!("{:#x}", BUYER));
		assert_eq!(json.as_object().unwrap().len(), 6);
		assert_eq!(artifact.message(), message);
	}

	#[test]
	fn test_parses_hand_written_purchase_artifact() {
		let input = r#"{
			"tokenId": "1",
			"deadline": "1234567890",
			"v": 27,
			"r": "0x1111111111111111111111111111111111111111111111111111111111111111",
			"s": "0x2222222222222222222222222222222222222222222222222222222222222222",
			"buyer": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
		}"#;
		let artifact = PurchasePermitArtifact::from_json(input).unwrap();
		assert_eq!(artifact.token_id, U256::from(1));
		assert_eq!(artifact.deadline, U256::from(1_234_567_890u64));
		assert_eq!(artifact.buyer, BUYER);
		assert_eq!(artifact.signature().r, B256::repeat_byte(0x11));
	}

	#[test]
	fn test_deposit_artifact_keeps_wide_values() {
		let artifact = DepositPermitArtifact {
			owner: BUYER,
			spender: Address::ZERO,
			value: U256::MAX,
			nonce: U256::from(3),
			deadline: U256::from(u64::MAX) + U256::from(1),
			v: 27,
			r: B256::repeat_byte(1),
			s: B256::repeat_byte(2),
		};
		let parsed = DepositPermitArtifact::from_json(&artifact.to_json_pretty().unwrap()).unwrap();
		assert_eq!(parsed, artifact);
	}

	#[test]
	fn test_malformed_artifacts_are_rejected() {
		let missing_field = r#"{"tokenId":"1","deadline":"2","v":27,"r":"0x1111111111111111111111111111111111111111111111111111111111111111","buyer":"0x70997970C51812dc3A010C7d01b50e0d17dc79C8"}"#;
		let err = PurchasePermitArtifact::from_json(missing_field).unwrap_err();
		assert!(err.to_string().contains("missing field `s`"));

		let short_r = r#"{"tokenId":"1","deadline":"2","v":27,"r":"0x11","s":"0x2222222222222222222222222222222222222222222222222222222222222222","buyer":"0x70997970C51812dc3A010C7d01b50e0d17dc79C8"}"#;
		assert!(matches!(
			PurchasePermitArtifact::from_json(short_r),
			Err(ArtifactError::Malformed(_))
		));

		let extra_field = r#"{"tokenId":"1","deadline":"2","v":27,"r":"0x1111111111111111111111111111111111111111111111111111111111111111","s":"0x2222222222222222222222222222222222222222222222222222222222222222","buyer":"0x70997970C51812dc3A010C7d01b50e0d17dc79C8","nonce":"0"}"#;
		assert!(PurchasePermitArtifact::from_json(extra_field).is_err());

		assert!(PurchasePermitArtifact::from_json("   ").is_err());
		assert!(PurchasePermitArtifact::from_json("not json").is_err());
	}

	#[test]
	fn test_zero_recovery_id_is_malformed() {
		let input = r#"{"tokenId":"1","deadline":"2","v":0,"r":"0x1111111111111111111111111111111111111111111111111111111111111111","s":"0x2222222222222222222222222222222222222222222222222222222222222222","buyer":"0x70997970C51812dc3A010C7d01b50e0d17dc79C8"}"#;
		let err = PurchasePermitArtifact::from_json(input).unwrap_err();
		assert!(err.to_string().contains("must be 27 or 28"));
	}
}
