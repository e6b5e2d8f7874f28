//! String formatting utilities.
//!
//! Token amount formatting for listing prices and truncation of long hex
//! values for log output.

/// Truncates a hex string for display, keeping the first 10 characters.
pub fn truncate_hex(value: &str) -> String {
	if value.len() <= 10 {
		value.to_string()
	} else {
		format!("{}..", &value[..10])
	}
}

/// Formats a raw on-chain token amount with decimal places for display.
///
/// # Arguments
///
/// * `amount` - The raw token amount as a decimal string
/// * `decimals` - The number of decimal places for the token
///
/// # Returns
///
/// A formatted string like "1.5" or "1000"
pub fn format_token_amount(amount: &str, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let decimal_places = decimals as usize;

	let (integer_part, decimal_part) = if amount.len() <= decimal_places {
		let decimal_str = format!("{:0>width$}", amount, width = decimal_places);
		("0".to_string(), decimal_str)
	} else {
		let split_pos = amount.len() - decimal_places;
		(
			amount[..split_pos].to_string(),
			amount[split_pos..].to_string(),
		)
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');

	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_hex() {
		assert_eq!(truncate_hex("0x1234"), "0x1234");
		assert_eq!(truncate_hex("0x1234567890abcdef"), "0x12345678..");
	}

	#[test]
	fn test_format_token_amount() {
		assert_eq!(format_token_amount("1000000000000000000", 18), "1");
		assert_eq!(format_token_amount("1500000000000000000", 18), "1.5");
		assert_eq!(format_token_amount("1", 18), "0.000000000000000001");
		assert_eq!(format_token_amount("42", 0), "42");
	}
}
