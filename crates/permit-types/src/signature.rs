//! Signature codec for 65-byte secp256k1 signatures.
//!
//! Layout is fixed: bytes `[0,32)` are `r`, `[32,64)` are `s` and byte 64 is
//! the recovery id `v`. Compact EIP-2098 signatures are not accepted. The
//! verifying contracts expect `v` in {27, 28}; custodians that return {0, 1}
//! go through [`normalize_recovery_id`] before decomposition.

use alloy::hex;
use alloy::primitives::{Address, Signature, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Errors from decoding or interpreting raw signatures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
	/// Input was not exactly 65 bytes.
	#[error("Signature must be {SIGNATURE_LENGTH} bytes, got {0}")]
	InvalidLength(usize),
	/// Input was not valid hex.
	#[error("Invalid signature hex: {0}")]
	InvalidHex(String),
	/// Recovery id outside the {27, 28} convention.
	#[error("Unsupported recovery id {0}, expected 27 or 28")]
	UnsupportedRecoveryId(u8),
	/// Public key recovery failed.
	#[error("Signer recovery failed: {0}")]
	Recovery(String),
}

/// The three scalar components of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureParts {
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

/// Splits a 65-byte signature into `(v, r, s)`. `v` is passed through unmodified.
pub fn decompose(signature: &[u8]) -> Result<SignatureParts, CodecError> {
	if signature.len() != SIGNATURE_LENGTH {
		return Err(CodecError::InvalidLength(signature.len()));
	}
	Ok(SignatureParts {
		r: B256::from_slice(&signature[0..32]),
		s: B256::from_slice(&signature[32..64]),
		v: signature[64],
	})
}

/// Reassembles `r || s || v`.
pub fn compose(parts: &SignatureParts) -> [u8; SIGNATURE_LENGTH] {
	let mut out = [0u8; SIGNATURE_LENGTH];
	out[0..32].copy_from_slice(parts.r.as_slice());
	out[32..64].copy_from_slice(parts.s.as_slice());
	out[64] = parts.v;
	out
}

/// Maps a {0, 1} recovery id to the {27, 28} convention. Other values are left alone.
pub fn normalize_recovery_id(mut signature: [u8; SIGNATURE_LENGTH]) -> [u8; SIGNATURE_LENGTH] {
	if signature[64] < 27 {
		signature[64] += 27;
	}
	signature
}

/// Decodes a `0x`-prefixed (or bare) hex signature string into raw bytes.
pub fn decode_signature_hex(signature: &str) -> Result<[u8; SIGNATURE_LENGTH], CodecError> {
	let bytes = hex::decode(signature.trim()).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
	bytes
		.as_slice()
		.try_into()
		.map_err(|_| CodecError::InvalidLength(bytes.len()))
}

impl SignatureParts {
	/// Rejects anything but the conventional {27, 28} recovery id.
	pub fn ensure_conventional_v(&self) -> Result<(), CodecError> {
		match self.v {
			27 | 28 => Ok(()),
			other => Err(CodecError::UnsupportedRecoveryId(other)),
		}
	}

	/// Converts to alloy's signature type. Requires a conventional `v`.
	pub fn to_signature(&self) -> Result<Signature, CodecError> {
		self.ensure_conventional_v()?;
		Ok(Signature::new(
			U256::from_be_bytes(self.r.0),
			U256::from_be_bytes(self.s.0),
			self.v == 28,
		))
	}

	/// Recovers the signer address of `digest`.
	pub fn recover(&self, digest: &B256) -> Result<Address, CodecError> {
		self.to_signature()?
			.recover_address_from_prehash(digest)
			.map_err(|e| CodecError::Recovery(e.to_string()))
	}

	/// `0x`-prefixed hex of the 65-byte encoding.
	pub fn to_hex(&self) -> String {
		hex::encode_prefixed(compose(self))
	}
}

impl TryFrom<&[u8]> for SignatureParts {
	type Error = CodecError;

	fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
		decompose(value)
	}
}
