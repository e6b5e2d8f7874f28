//! Configuration for the permit toolkit.
//!
//! Configuration is TOML. String values may reference environment variables
//! as `${VAR}` or `${VAR:-default}`, which keeps signing keys out of the file.
//!
//! ## Modular Configuration Support
//!
//! A file may pull in others with `include = ["contracts.toml", ...]`. Each
//! top-level section must appear in exactly one file.

mod loader;

use permit_types::ContractDeployment;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input.
		ConfigError::Parse(err.message().to_string())
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Deployed token, bank and market contracts.
	pub contracts: ContractDeployment,
	#[serde(default)]
	pub issuer: IssuerConfig,
	/// Signing capability.
	pub account: AccountConfig,
	/// Verifying-contract access.
	pub verifier: VerifierConfig,
	/// Optional HTTP API.
	pub api: Option<ApiConfig>,
}

/// Settings for the permit issuer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IssuerConfig {
	/// Lifetime of a permit whose deadline the caller did not set.
	#[serde(default = "default_validity_seconds")]
	pub validity_seconds: u64,
	/// When set, signing is refused if the connected chain reports a different id.
	pub expected_chain_id: Option<u64>,
}

impl Default for IssuerConfig {
	fn default() -> Self {
		Self {
			validity_seconds: default_validity_seconds(),
			expected_chain_id: None,
		}
	}
}

fn default_validity_seconds() -> u64 {
	3600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub primary: String,
	/// Implementation name to its raw TOML table.
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifierConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
	/// Interval between outcome polls after a submission.
	#[serde(default = "default_poll_seconds")]
	pub confirmation_poll_seconds: u64,
	/// Give up waiting for an outcome after this long.
	#[serde(default = "default_confirmation_timeout")]
	pub confirmation_timeout_seconds: u64,
}

fn default_poll_seconds() -> u64 {
	2
}

fn default_confirmation_timeout() -> u64 {
	120
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Origins allowed by CORS. Empty means any origin.
	#[serde(default)]
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// Input is capped at 1MB before the regex runs.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();

		let value = match (std::env::var(var_name), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name
				)));
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Back to front so earlier offsets stay valid.
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads a configuration file, following `include` directives relative to
	/// the file's directory.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.contracts.token.name.is_empty() {
			return Err(ConfigError::Validation(
				"contracts.token.name cannot be empty".into(),
			));
		}
		if self.contracts.market.name.is_empty() {
			return Err(ConfigError::Validation(
				"contracts.market.name cannot be empty".into(),
			));
		}
		if self.contracts.token.address == self.contracts.market.address {
			return Err(ConfigError::Validation(
				"Token and market must be distinct contracts".into(),
			));
		}

		if self.issuer.validity_seconds == 0 {
			return Err(ConfigError::Validation(
				"issuer.validity_seconds must be greater than 0".into(),
			));
		}

		validate_pluggable(
			"account",
			&self.account.primary,
			&self.account.implementations,
		)?;
		validate_pluggable(
			"verifier",
			&self.verifier.primary,
			&self.verifier.implementations,
		)?;

		if self.verifier.confirmation_poll_seconds == 0 {
			return Err(ConfigError::Validation(
				"verifier.confirmation_poll_seconds must be at least 1".into(),
			));
		}
		if self.verifier.confirmation_timeout_seconds < self.verifier.confirmation_poll_seconds {
			return Err(ConfigError::Validation(
				"verifier.confirmation_timeout_seconds cannot be shorter than the poll interval"
					.into(),
			));
		}

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("api.port cannot be 0".into()));
			}
		}

		Ok(())
	}
}

fn validate_pluggable(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		tracing::debug!(
			account = %config.account.primary,
			verifier = %config.verifier.primary,
			"Configuration validated"
		);
		Ok(config)
	}
}
