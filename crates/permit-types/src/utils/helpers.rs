//! Helper utilities for common operations.

use chrono::Utc;

/// Current UNIX timestamp in seconds, or 0 if the clock reads before the epoch.
pub fn current_timestamp() -> u64 {
	u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_current_timestamp_is_recent() {
		// 2023-11-14T22:13:20Z
		assert!(current_timestamp() > 1_700_000_000);
	}
}
