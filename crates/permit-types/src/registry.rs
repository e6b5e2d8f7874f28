//! Registration contract for pluggable signer and verifier implementations.

/// Ties a configuration name to the factory that builds the implementation.
///
/// The name is the key used under `implementations` in the TOML config, for
/// example `local` for `[account.implementations.local]` or `rpc` for
/// `[verifier.implementations.rpc]`.
pub trait ImplementationRegistry {
	const NAME: &'static str;

	/// Factory signature, defined per implementation family.
	type Factory;

	fn factory() -> Self::Factory;
}
