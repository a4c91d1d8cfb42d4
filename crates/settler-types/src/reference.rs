//! Correlation reference construction and extraction.
//!
//! The correlation reference is the only link between the two legs of the
//! payment protocol: it is embedded in the outbound initiation request as
//! the account reference and echoed back verbatim in the asynchronous
//! callback. The format is a fixed prefix followed by the order id, so the
//! reference always resolves to exactly one order.

/// Prefix prepended to the order id to form the account reference.
pub const REFERENCE_PREFIX: &str = "Order-";

/// Builds the correlation reference for an order.
pub fn build_reference(order_id: &str) -> String {
	format!("{}{}", REFERENCE_PREFIX, order_id)
}

/// Recovers the order id from an echoed correlation reference.
///
/// Returns `None` when the reference does not carry the expected prefix or
/// the remainder is empty. Surrounding whitespace is tolerated since some
/// network gateways pad metadata values.
pub fn extract_order_id(reference: &str) -> Option<&str> {
	match reference.trim().strip_prefix(REFERENCE_PREFIX) {
		Some(id) if !id.is_empty() => Some(id),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_reference_round_trip() {
		let ids = [
			"6650f1f0a3b4c5d6e7f80912",
			"a-b-c",
			"ORDER-inner", // prefix-like content inside the id survives
		];
		for id in ids {
			assert_eq!(extract_order_id(&build_reference(id)), Some(id));
		}
	}

	#[test]
	fn test_extract_tolerates_whitespace() {
		assert_eq!(extract_order_id("  Order-abc123 "), Some("abc123"));
	}

	#[test]
	fn test_extract_rejects_foreign_references() {
		assert_eq!(extract_order_id("Invoice-abc123"), None);
		assert_eq!(extract_order_id("order-abc123"), None); // case sensitive
		assert_eq!(extract_order_id(""), None);
	}

	#[test]
	fn test_extract_rejects_empty_remainder() {
		assert_eq!(extract_order_id("Order-"), None);
		assert_eq!(extract_order_id("  Order-  "), None);
	}
}
