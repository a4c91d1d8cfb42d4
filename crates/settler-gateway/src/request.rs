//! Initiation payload construction.
//!
//! Everything here is a pure function of its inputs, including the clock:
//! the caller injects `now`, so identical inputs always produce a
//! byte-identical payload and digest. The digest must be derived from the
//! same timestamp value that is transmitted, since the network recomputes
//! and compares it.

use crate::GatewayError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use settler_types::build_reference;

/// Country code prefix for normalized phone numbers.
const COUNTRY_PREFIX: &str = "254";

/// Transaction type for customer-initiated paybill payments.
const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// Outbound STK Push initiation payload, in the network's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StkPushRequest {
	#[serde(rename = "BusinessShortCode")]
	pub business_short_code: String,
	#[serde(rename = "Password")]
	pub password: String,
	#[serde(rename = "Timestamp")]
	pub timestamp: String,
	#[serde(rename = "TransactionType")]
	pub transaction_type: String,
	#[serde(rename = "Amount")]
	pub amount: u64,
	#[serde(rename = "PartyA")]
	pub party_a: String,
	#[serde(rename = "PartyB")]
	pub party_b: String,
	#[serde(rename = "PhoneNumber")]
	pub phone_number: String,
	#[serde(rename = "CallBackURL")]
	pub callback_url: String,
	#[serde(rename = "AccountReference")]
	pub account_reference: String,
	#[serde(rename = "TransactionDesc")]
	pub transaction_desc: String,
}

/// Normalizes a subscriber phone number to international form.
///
/// A local-format number (leading `0`, ten digits) is rewritten to the
/// country-code prefix; an already international number passes through,
/// with or without a leading `+`. Anything else is rejected rather than
/// forwarded to the network.
pub fn normalize_phone(raw: &str) -> Result<String, GatewayError> {
	let trimmed = raw.trim();
	let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return Err(GatewayError::InvalidPhoneNumber(format!(
			"'{}' contains non-digit characters",
			raw
		)));
	}

	if let Some(rest) = digits.strip_prefix('0') {
		if digits.len() == 10 {
			return Ok(format!("{}{}", COUNTRY_PREFIX, rest));
		}
		return Err(GatewayError::InvalidPhoneNumber(format!(
			"'{}' is not a valid local-format number",
			raw
		)));
	}

	if digits.starts_with(COUNTRY_PREFIX) && digits.len() == 12 {
		return Ok(digits.to_string());
	}

	Err(GatewayError::InvalidPhoneNumber(format!(
		"'{}' is not in a recognized format",
		raw
	)))
}

/// Rounds an amount to the network's minimum currency unit (whole
/// shillings), rejecting non-positive results.
pub fn round_amount(amount: Decimal) -> Result<u64, GatewayError> {
	let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
	if rounded <= Decimal::ZERO {
		return Err(GatewayError::InvalidAmount(format!(
			"amount must be positive, got {}",
			amount
		)));
	}
	rounded
		.to_u64()
		.ok_or_else(|| GatewayError::InvalidAmount(format!("amount {} out of range", amount)))
}

/// Formats a timestamp in the network's fixed-width `YYYYMMDDHHMMSS` form.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
	now.format("%Y%m%d%H%M%S").to_string()
}

/// Derives the initiation password digest from the merchant shortcode,
/// passkey, and the transmitted timestamp.
pub fn password_digest(shortcode: &str, passkey: &str, timestamp: &str) -> String {
	BASE64.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}

/// Builds a complete initiation payload.
///
/// Performs no I/O; fully deterministic given its inputs.
#[allow(clippy::too_many_arguments)]
pub fn build_stk_push(
	shortcode: &str,
	passkey: &str,
	amount: Decimal,
	phone_number: &str,
	order_id: &str,
	callback_url: &str,
	now: DateTime<Utc>,
) -> Result<StkPushRequest, GatewayError> {
	let phone = normalize_phone(phone_number)?;
	let amount = round_amount(amount)?;
	let timestamp = format_timestamp(now);
	let password = password_digest(shortcode, passkey, &timestamp);

	Ok(StkPushRequest {
		business_short_code: shortcode.to_string(),
		password,
		timestamp,
		transaction_type: TRANSACTION_TYPE.to_string(),
		amount,
		party_a: phone.clone(),
		party_b: shortcode.to_string(),
		phone_number: phone,
		callback_url: callback_url.to_string(),
		account_reference: build_reference(order_id),
		transaction_desc: format!("Payment for order #{}", order_id),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn fixed_now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 5).unwrap()
	}

	#[test]
	fn test_normalize_local_format() {
		assert_eq!(normalize_phone("0712345678").unwrap(), "254712345678");
		assert_eq!(normalize_phone("0110345678").unwrap(), "254110345678");
	}

	#[test]
	fn test_normalize_international_formats() {
		assert_eq!(normalize_phone("254712345678").unwrap(), "254712345678");
		assert_eq!(normalize_phone("+254712345678").unwrap(), "254712345678");
		assert_eq!(normalize_phone(" 254712345678 ").unwrap(), "254712345678");
	}

	#[test]
	fn test_normalize_rejects_malformed() {
		for bad in ["", "07123", "07123456789", "712345678", "25471234567", "0712-345-678", "n/a"] {
			assert!(
				matches!(normalize_phone(bad), Err(GatewayError::InvalidPhoneNumber(_))),
				"expected rejection for {:?}",
				bad
			);
		}
	}

	#[test]
	fn test_round_amount() {
		assert_eq!(round_amount(Decimal::from(200)).unwrap(), 200);
		assert_eq!(round_amount(Decimal::new(19950, 2)).unwrap(), 200); // 199.50 rounds up
		assert_eq!(round_amount(Decimal::new(19949, 2)).unwrap(), 199);
	}

	#[test]
	fn test_round_amount_rejects_non_positive() {
		assert!(round_amount(Decimal::ZERO).is_err());
		assert!(round_amount(Decimal::from(-5)).is_err());
		// Rounds to zero: still non-positive.
		assert!(round_amount(Decimal::new(4, 1)).is_err());
	}

	#[test]
	fn test_timestamp_format_is_fixed_width() {
		assert_eq!(format_timestamp(fixed_now()), "20240115093005");
	}

	#[test]
	fn test_build_is_deterministic() {
		let build = || {
			build_stk_push(
				"174379",
				"passkey",
				Decimal::from(200),
				"0712345678",
				"abc123",
				"https://shop.example.com/api/payments/callback",
				fixed_now(),
			)
			.unwrap()
		};

		let first = build();
		let second = build();
		assert_eq!(first, second);
		assert_eq!(
			serde_json::to_vec(&first).unwrap(),
			serde_json::to_vec(&second).unwrap()
		);
	}

	#[test]
	fn test_digest_uses_transmitted_timestamp() {
		let request = build_stk_push(
			"174379",
			"passkey",
			Decimal::from(200),
			"0712345678",
			"abc123",
			"https://shop.example.com/api/payments/callback",
			fixed_now(),
		)
		.unwrap();

		let decoded = BASE64.decode(&request.password).unwrap();
		let decoded = String::from_utf8(decoded).unwrap();
		assert_eq!(decoded, format!("174379passkey{}", request.timestamp));
	}

	#[test]
	fn test_build_embeds_reference_and_normalized_phone() {
		let request = build_stk_push(
			"174379",
			"passkey",
			Decimal::from(200),
			"0712345678",
			"abc123",
			"https://shop.example.com/api/payments/callback",
			fixed_now(),
		)
		.unwrap();

		assert_eq!(request.account_reference, "Order-abc123");
		assert_eq!(request.phone_number, "254712345678");
		assert_eq!(request.party_a, "254712345678");
		assert_eq!(request.party_b, "174379");
		assert_eq!(request.amount, 200);
	}

	#[test]
	fn test_wire_field_names() {
		let request = build_stk_push(
			"174379",
			"passkey",
			Decimal::from(200),
			"0712345678",
			"abc123",
			"https://cb",
			fixed_now(),
		)
		.unwrap();
		let value = serde_json::to_value(&request).unwrap();

		for field in [
			"BusinessShortCode",
			"Password",
			"Timestamp",
			"TransactionType",
			"Amount",
			"PartyA",
			"PartyB",
			"PhoneNumber",
			"CallBackURL",
			"AccountReference",
			"TransactionDesc",
		] {
			assert!(value.get(field).is_some(), "missing wire field {}", field);
		}
		assert_eq!(value["TransactionType"], "CustomerPayBillOnline");
	}
}
