//! Utility functions for hashing, formatting and serialization helpers.

pub mod eip712;
pub mod formatting;
pub mod helpers;
pub mod u256_serde;

pub use eip712::{
	compute_domain_hash, compute_final_digest, Eip712AbiEncoder, DOMAIN_TYPE, PERMIT_BUY_TYPE,
	PERMIT_TYPE,
};
pub use formatting::{format_token_amount, truncate_hex};
pub use helpers::current_timestamp;
