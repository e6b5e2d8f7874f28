//! Read-only projection of the market's listings.
//!
//! The market contract returns listings as four parallel arrays; index `i`
//! across all four describes one listing.

use crate::utils::u256_serde;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
	#[error(
		"Listing sequences differ in length: tokenIds={token_ids}, sellers={sellers}, prices={prices}, actives={actives}"
	)]
	LengthMismatch {
		token_ids: usize,
		sellers: usize,
		prices: usize,
		actives: usize,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
	#[serde(with = "u256_serde")]
	pub token_id: U256,
	pub seller: Address,
	#[serde(with = "u256_serde")]
	pub price: U256,
	pub active: bool,
}

/// Zips the four parallel sequences into listing records.
pub fn zip_listings(
	token_ids: Vec<U256>,
	sellers: Vec<Address>,
	prices: Vec<U256>,
	actives: Vec<bool>,
) -> Result<Vec<Listing>, ListingError> {
	let len = token_ids.len();
	if sellers.len() != len || prices.len() != len || actives.len() != len {
		return Err(ListingError::LengthMismatch {
			token_ids: len,
			sellers: sellers.len(),
			prices: prices.len(),
			actives: actives.len(),
		});
	}

	Ok(token_ids
		.into_iter()
		.zip(sellers)
		.zip(prices)
		.zip(actives)
		.map(|(((token_id, seller), price), active)| Listing {
			token_id,
			seller,
			price,
			active,
		})
		.collect())
}
