//! Registry of every signer and verifier implementation the binary ships.
//!
//! Configuration names an implementation; this module maps the name to its
//! factory and hands the selection to the toolkit builder.

use permit_account::AccountFactory;
use permit_config::Config;
use permit_core::{PermitBuilder, PermitFactories, PermitToolkit};
use permit_verifier::VerifierFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

pub struct FactoryRegistry {
	pub account: HashMap<String, AccountFactory>,
	pub verifier: HashMap<String, VerifierFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			account: HashMap::new(),
			verifier: HashMap::new(),
		}
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}

	pub fn register_verifier(&mut self, name: impl Into<String>, factory: VerifierFactory) {
		self.verifier.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Global registry, filled on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in permit_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}

		for (name, factory) in permit_verifier::get_all_implementations() {
			tracing::debug!("Registering verifier implementation: {}", name);
			registry.register_verifier(name, factory);
		}

		registry
	})
}

/// Picks the factories for every implementation named in `$config_impls`.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

pub async fn build_toolkit_from_config(
	config: Config,
) -> Result<PermitToolkit, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let account_factories =
		build_factories!(registry, config.account.implementations, account, "account");
	let verifier_factories = build_factories!(
		registry,
		config.verifier.implementations,
		verifier,
		"verifier"
	);

	let factories = PermitFactories {
		account_factories,
		verifier_factories,
	};

	Ok(PermitBuilder::new(config).build(factories).await?)
}
