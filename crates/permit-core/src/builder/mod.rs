//! Assembles an issuer and submitter from configuration.
//!
//! Implementations are picked by name from factory maps, so the binary
//! decides which signers and verifiers exist and the configuration decides
//! which one is used.

use crate::issuer::PermitIssuer;
use crate::submitter::PermitSubmitter;
use alloy::primitives::Address;
use permit_account::{AccountError, AccountService, SignerInterface};
use permit_config::Config;
use permit_types::{ContractDeployment, SecretString, ValidationError};
use permit_verifier::{VerifierError, VerifierInterface};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory maps keyed by implementation name.
pub struct PermitFactories<AF, VF> {
	pub account_factories: HashMap<String, AF>,
	pub verifier_factories: HashMap<String, VF>,
}

/// Everything the CLI and API need, built once at startup.
pub struct PermitToolkit {
	pub account: Arc<AccountService>,
	pub verifier: Arc<dyn VerifierInterface>,
	pub issuer: PermitIssuer,
	pub submitter: PermitSubmitter,
	pub contracts: ContractDeployment,
	/// Address of the configured signer, also the transaction sender.
	pub signer_address: Address,
}

fn invalid_config(component: &str, name: &str, error: ValidationError) -> BuilderError {
	tracing::error!(
		component = %component,
		implementation = %name,
		error = %error,
		"Invalid configuration for implementation"
	);
	BuilderError::Config(format!(
		"Invalid configuration for {} implementation '{}': {}",
		component, name, error
	))
}

pub struct PermitBuilder {
	config: Config,
}

impl PermitBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	pub async fn build<AF, VF>(
		self,
		factories: PermitFactories<AF, VF>,
	) -> Result<PermitToolkit, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn SignerInterface>, AccountError>,
		VF: Fn(
			&toml::Value,
			&ContractDeployment,
			Option<&SecretString>,
		) -> Result<Box<dyn VerifierInterface>, VerifierError>,
	{
		let account_name = &self.config.account.primary;
		let account_config = self
			.config
			.account
			.implementations
			.get(account_name)
			.ok_or_else(|| BuilderError::MissingComponent(format!("account '{}'", account_name)))?;
		let account_factory = factories.account_factories.get(account_name).ok_or_else(|| {
			BuilderError::Config(format!("Unknown account implementation '{}'", account_name))
		})?;

		let account = match account_factory(account_config) {
			Ok(implementation) => {
				implementation
					.config_schema()
					.validate(account_config)
					.map_err(|e| invalid_config("account", account_name, e))?;
				tracing::info!(component = "account", implementation = %account_name, "Loaded");
				Arc::new(AccountService::new(implementation))
			},
			Err(e) => {
				tracing::error!(
					component = "account",
					implementation = %account_name,
					error = %e,
					"Failed to create account implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create account implementation '{}': {}",
					account_name, e
				)));
			},
		};

		let signer_address = account.get_address().await.map_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get signer address");
			BuilderError::Config(format!("Failed to get signer address: {}", e))
		})?;

		let verifier_name = &self.config.verifier.primary;
		let verifier_config = self
			.config
			.verifier
			.implementations
			.get(verifier_name)
			.ok_or_else(|| BuilderError::MissingComponent(format!("verifier '{}'", verifier_name)))?;
		let verifier_factory = factories.verifier_factories.get(verifier_name).ok_or_else(|| {
			BuilderError::Config(format!("Unknown verifier implementation '{}'", verifier_name))
		})?;

		// The signer's key, when it exposes one, also pays for submissions.
		let private_key = account.get_private_key();
		let verifier: Arc<dyn VerifierInterface> =
			match verifier_factory(verifier_config, &self.config.contracts, private_key.as_ref()) {
				Ok(implementation) => {
					implementation
						.config_schema()
						.validate(verifier_config)
						.map_err(|e| invalid_config("verifier", verifier_name, e))?;
					tracing::info!(component = "verifier", implementation = %verifier_name, "Loaded");
					Arc::from(implementation)
				},
				Err(e) => {
					tracing::error!(
						component = "verifier",
						implementation = %verifier_name,
						error = %e,
						"Failed to create verifier implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create verifier implementation '{}': {}",
						verifier_name, e
					)));
				},
			};

		let issuer = PermitIssuer::new(
			account.clone(),
			verifier.clone(),
			self.config.contracts.clone(),
			self.config.issuer.clone(),
		);
		let submitter = PermitSubmitter::new(
			verifier.clone(),
			Duration::from_secs(self.config.verifier.confirmation_poll_seconds),
			Duration::from_secs(self.config.verifier.confirmation_timeout_seconds),
		);

		tracing::info!(signer = %signer_address, "Permit toolkit ready");
		Ok(PermitToolkit {
			account,
			verifier,
			issuer,
			submitter,
			contracts: self.config.contracts,
			signer_address,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::issuer::{DepositPermitRequest, PurchasePermitRequest};
	use crate::PermitError;
	use alloy::primitives::{address, U256};
	use alloy::signers::local::PrivateKeySigner;
	use alloy::signers::SignerSync;
	use permit_types::{build_permit_message, decompose, DepositPermitArtifact};
	use permit_verifier::implementations::simulated::SimulatedContracts;
	use permit_verifier::RejectionReason;
	use std::str::FromStr;

	const BUYER: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

	fn config(simulated: &str) -> Config {
		let toml = format!(
			r#"
[contracts]
bank = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
[contracts.token]
name = "HTToken"
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
[contracts.market]
name = "NFTMarket"
address = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"

[account]
primary = "local"
[account.implementations.local]
private_key = "{}"

[verifier]
primary = "simulated"
confirmation_poll_seconds = 1
confirmation_timeout_seconds = 5
[verifier.implementations.simulated]
chain_id = 31337
timestamp = 1700000000
{}
"#,
			crate::testing::ISSUER_KEY,
			simulated
		);
		Config::from_str(&toml).unwrap()
	}

	async fn toolkit(simulated: &str) -> PermitToolkit {
		let factories = PermitFactories {
			account_factories: permit_account::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			verifier_factories: permit_verifier::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		};
		PermitBuilder::new(config(simulated))
			.build(factories)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_deposit_permit_is_consumed_once() {
		let toolkit = toolkit("").await;
		let owner = toolkit.signer_address;
		assert_eq!(owner, crate::testing::ISSUER_ADDRESS);

		let value = U256::from(10u64).pow(U256::from(18));
		let artifact = toolkit
			.issuer
			.issue_deposit_permit(DepositPermitRequest {
				value: Some(value),
				deadline: None,
			})
			.await
			.unwrap();
		assert_eq!(artifact.nonce, U256::ZERO);

		toolkit
			.submitter
			.submit_deposit(owner, &artifact)
			.await
			.unwrap();
		assert_eq!(toolkit.verifier.deposited(owner).await.unwrap(), value);
		assert_eq!(toolkit.verifier.nonce(owner).await.unwrap(), U256::from(1));

		let err = toolkit
			.submitter
			.submit_deposit(owner, &artifact)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::Rejected(RejectionReason::StaleNonce)));
		assert_eq!(toolkit.verifier.deposited(owner).await.unwrap(), value);
	}

	#[tokio::test]
	async fn test_permit_signed_over_future_nonce_is_stale() {
		let toolkit = toolkit("").await;
		let signer = PrivateKeySigner::from_str(crate::testing::ISSUER_KEY).unwrap();
		let owner = signer.address();

		let message = build_permit_message(
			owner,
			toolkit.contracts.bank,
			U256::from(1_000),
			U256::from(1),
			U256::from(1_700_003_600u64),
		);
		let digest = message.signing_hash(&toolkit.contracts.token_domain(31337));
		let signature = decompose(&signer.sign_hash_sync(&digest).unwrap().as_bytes()).unwrap();
		let artifact = DepositPermitArtifact::new(&message, signature);

		let err = toolkit
			.submitter
			.submit_deposit(owner, &artifact)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::Rejected(RejectionReason::StaleNonce)));
		assert_eq!(toolkit.verifier.nonce(owner).await.unwrap(), U256::ZERO);
	}

	#[tokio::test]
	async fn test_expired_deposit_permit() {
		let toolkit = toolkit("").await;
		let artifact = toolkit
			.issuer
			.issue_deposit_permit(DepositPermitRequest {
				value: Some(U256::from(1)),
				deadline: Some(U256::from(1_699_999_999u64)),
			})
			.await
			.unwrap();

		let err = toolkit
			.submitter
			.submit_deposit(toolkit.signer_address, &artifact)
			.await
			.unwrap_err();
		assert!(matches!(err, PermitError::Rejected(RejectionReason::Expired)));
	}

	#[tokio::test]
	async fn test_purchase_permit_is_single_use() {
		let toolkit = toolkit(
			r#"
whitelist = ["0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"]
[[verifier.implementations.simulated.listings]]
token_id = 5
seller = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"
price = "1000000000000000000"
"#,
		)
		.await;

		let artifact = toolkit
			.issuer
			.issue_purchase_permit(PurchasePermitRequest {
				buyer: Some(BUYER),
				token_id: Some(U256::from(5)),
				deadline: None,
			})
			.await
			.unwrap();

		toolkit
			.submitter
			.submit_purchase(BUYER, &artifact)
			.await
			.unwrap();
		let listings = toolkit.verifier.listings().await.unwrap();
		assert!(!listings[0].active);

		let err = toolkit
			.submitter
			.submit_purchase(BUYER, &artifact)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			PermitError::Rejected(RejectionReason::AlreadyConsumed)
		));
	}

	#[tokio::test]
	async fn test_purchase_permit_from_unlisted_issuer() {
		let toolkit = toolkit(
			r#"
[[verifier.implementations.simulated.listings]]
token_id = 5
seller = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"
price = "1000"
"#,
		)
		.await;

		let artifact = toolkit
			.issuer
			.issue_purchase_permit(PurchasePermitRequest {
				buyer: Some(BUYER),
				token_id: Some(U256::from(5)),
				deadline: None,
			})
			.await
			.unwrap();

		let err = toolkit
			.submitter
			.submit_purchase(BUYER, &artifact)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			PermitError::Rejected(RejectionReason::UnauthorizedSigner)
		));
	}

	/// Skips the factory's own checks so only the builder sees the table.
	fn lenient_verifier(
		_config: &toml::Value,
		contracts: &ContractDeployment,
		_key: Option<&SecretString>,
	) -> Result<Box<dyn VerifierInterface>, VerifierError> {
		Ok(Box::new(SimulatedContracts::new(31337, contracts.clone())))
	}

	#[tokio::test]
	async fn test_verifier_table_checked_against_schema() {
		let config = config(r#"whitelist = ["0x1234"]"#);
		let factories = PermitFactories {
			account_factories: permit_account::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			verifier_factories: HashMap::from([("simulated".to_string(), lenient_verifier)]),
		};

		let err = PermitBuilder::new(config)
			.build(factories)
			.await
			.err()
			.unwrap();
		match err {
			BuilderError::Config(message) => assert!(message.contains("whitelist[0]")),
			other => panic!("unexpected error {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_unknown_verifier_implementation() {
		let mut config = config("");
		config.verifier.primary = "missing".to_string();
		let factories = PermitFactories {
			account_factories: permit_account::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			verifier_factories: permit_verifier::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		};
		let result = PermitBuilder::new(config).build(factories).await;
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}
}
