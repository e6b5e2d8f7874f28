//! Serde module for `U256` fields in permit artifacts and typed-data payloads.
//!
//! Values serialize as decimal strings so that 256-bit amounts survive JSON
//! tooling that parses numbers as doubles. Deserialization accepts decimal
//! strings, `0x`-prefixed hex strings, and plain JSON integers.

use alloy::primitives::U256;
use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
	Text(String),
	Number(u64),
}

pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	value.to_string().serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	match Repr::deserialize(deserializer)? {
		Repr::Number(n) => Ok(U256::from(n)),
		Repr::Text(s) => parse_u256(&s).map_err(D::Error::custom),
	}
}

/// Parses a decimal or `0x`-prefixed hex string into a `U256`.
pub fn parse_u256(s: &str) -> Result<U256, String> {
	let trimmed = s.trim();
	if trimmed.is_empty() {
		return Err("empty integer string".to_string());
	}
	let parsed = match trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
	{
		Some(hex) => U256::from_str_radix(hex, 16),
		None => U256::from_str_radix(trimmed, 10),
	};
	parsed.map_err(|e| format!("invalid uint256 '{}': {}", trimmed, e))
}

/// Same encoding for optional fields. Use with `#[serde(default)]`.
pub mod option {
	use super::Repr;
	use alloy::primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(v) => super::serialize(v, serializer),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<Repr>::deserialize(deserializer)? {
			None => Ok(None),
			Some(Repr::Number(n)) => Ok(Some(U256::from(n))),
			Some(Repr::Text(s)) => super::parse_u256(&s).map(Some).map_err(D::Error::custom),
		}
	}
}
