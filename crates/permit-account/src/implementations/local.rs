//! Private-key signer.
//!
//! Holds a secp256k1 key in memory and signs EIP-712 digests directly. With
//! `require_confirmation = true` every request is shown on the terminal and
//! only signed after the operator types `y`; anything else declines.

use crate::{AccountError, SignerInterface};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use permit_types::{
	ConfigSchema, Field, FieldType, Schema, SecretString, TypedDataRequest, ValidationError,
	SIGNATURE_LENGTH,
};
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Decides whether a request may be signed. `false` declines.
pub type ConfirmFn = Arc<dyn Fn(&TypedDataRequest) -> bool + Send + Sync>;

pub struct LocalSigner {
	signer: PrivateKeySigner,
	private_key: SecretString,
	confirm: Option<ConfirmFn>,
}

impl LocalSigner {
	pub fn new(private_key: SecretString) -> Result<Self, AccountError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| AccountError::InvalidKey("Invalid private key format".to_string()))
		})?;
		Ok(Self {
			signer,
			private_key,
			confirm: None,
		})
	}

	/// Requires `confirm` to approve each request before signing.
	pub fn with_confirmation(mut self, confirm: ConfirmFn) -> Self {
		self.confirm = Some(confirm);
		self
	}
}

/// Prints the request to stderr and reads the operator's answer from stdin.
fn prompt_on_terminal(request: &TypedDataRequest) -> bool {
	let payload = request.to_payload();
	let mut stderr = std::io::stderr();
	let _ = writeln!(
		stderr,
		"Sign {} for {} on chain {}?\n{}",
		request.primary_type(),
		request.domain.name,
		request.domain.chain_id,
		serde_json::to_string_pretty(&payload["message"]).unwrap_or_default()
	);
	let _ = write!(stderr, "[y/N] ");
	let _ = stderr.flush();

	let mut answer = String::new();
	match std::io::stdin().lock().read_line(&mut answer) {
		Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
		Err(_) => false,
	}
}

pub struct LocalSignerSchema;

impl LocalSignerSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for LocalSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let hex = key.strip_prefix("0x").unwrap_or(key);
					if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("must be 32 bytes of hex".to_string());
					}
					Ok(())
				}),
			],
			vec![Field::new("require_confirmation", FieldType::Boolean)],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalSignerSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_typed_data(
		&self,
		request: &TypedDataRequest,
	) -> Result<[u8; SIGNATURE_LENGTH], AccountError> {
		if let Some(confirm) = &self.confirm {
			let confirm = Arc::clone(confirm);
			let pending = request.clone();
			let approved = tokio::task::spawn_blocking(move || confirm(&pending))
				.await
				.map_err(|e| AccountError::Unavailable(format!("Confirmation aborted: {}", e)))?;
			if !approved {
				tracing::info!(
					primary_type = request.primary_type(),
					"Operator declined signature request"
				);
				return Err(AccountError::Declined(
					"operator rejected the request".to_string(),
				));
			}
		}

		let digest = request.digest();
		let signature = self
			.signer
			.sign_hash(&digest)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(signature.as_bytes())
	}

	fn get_private_key(&self) -> Option<SecretString> {
		Some(self.private_key.clone())
	}
}

/// Builds a [`LocalSigner`] from `[account.implementations.local]`.
///
/// - `private_key` (required): hex secp256k1 key
/// - `require_confirmation` (optional): prompt before each signature
pub fn create_account(config: &toml::Value) -> Result<Box<dyn SignerInterface>, AccountError> {
	LocalSignerSchema::validate_config(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	let signer = LocalSigner::new(private_key)?;
	let require_confirmation = config
		.get("require_confirmation")
		.and_then(|v| v.as_bool())
		.unwrap_or(false);

	if require_confirmation {
		Ok(Box::new(signer.with_confirmation(Arc::new(prompt_on_terminal))))
	} else {
		Ok(Box::new(signer))
	}
}

pub struct Registry;

impl permit_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}
