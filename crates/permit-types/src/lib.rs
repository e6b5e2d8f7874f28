//! Shared types for the permit toolkit.
//!
//! Covers the EIP-712 signing domains and typed messages of the two permit
//! protocols, the 65-byte signature codec, the signed artifacts exchanged
//! between issuer and submitter, and the plumbing shared by the pluggable
//! signer and verifier implementations.

/// Signed permit records and their JSON interchange format.
pub mod artifact;
/// Deployed contract addresses and names.
pub mod contracts;
/// EIP-712 signing domains.
pub mod domain;
/// Market listing projection.
pub mod listing;
/// `Permit` and `PermitBuy` typed messages.
pub mod message;
pub mod registry;
pub mod secret_string;
/// Raw signature decomposition and recovery.
pub mod signature;
pub mod utils;
/// Configuration schema checks for pluggable implementations.
pub mod validation;

pub use artifact::{ArtifactError, DepositPermitArtifact, PurchasePermitArtifact};
pub use contracts::{ContractDeployment, NamedContract};
pub use domain::{build_domain, SigningDomain, DOMAIN_VERSION};
pub use listing::{zip_listings, Listing, ListingError};
pub use message::{
	build_permit_buy_message, build_permit_message, encode_type, PermitBuyMessage, PermitMessage,
	TypeField, TypedDataRequest, TypedMessage, DOMAIN_TYPE_FIELDS, PERMIT_BUY_TYPE_FIELDS,
	PERMIT_TYPE_FIELDS,
};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use signature::{
	compose, decode_signature_hex, decompose, normalize_recovery_id, CodecError, SignatureParts,
	SIGNATURE_LENGTH,
};
pub use utils::{current_timestamp, format_token_amount, truncate_hex};
pub use validation::{ConfigSchema, Field, FieldType, Schema, ValidationError};
