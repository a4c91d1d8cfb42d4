//! Daraja STK callback correlator.
//!
//! Owns the network's envelope shape: `Body.stkCallback` with a result
//! code, description, and (on success) a metadata item list carrying the
//! correlation reference and receipt number.

use crate::{CorrelatorInterface, NoticeResult, PaymentNotice, SettlementError};
use settler_types::{
	extract_order_id, CallbackEnvelope, ACCOUNT_REFERENCE_ITEM, RECEIPT_NUMBER_ITEM,
};

/// Correlator for the Daraja callback envelope.
pub struct DarajaCorrelator;

impl DarajaCorrelator {
	/// Creates a new DarajaCorrelator.
	pub fn new() -> Self {
		Self
	}
}

impl Default for DarajaCorrelator {
	fn default() -> Self {
		Self::new()
	}
}

impl CorrelatorInterface for DarajaCorrelator {
	fn parse(&self, body: &serde_json::Value) -> Result<PaymentNotice, SettlementError> {
		let envelope: CallbackEnvelope = serde_json::from_value(body.clone())
			.map_err(|e| SettlementError::InvalidShape(e.to_string()))?;

		let callback = envelope.body.stk_callback;

		let reference = callback.metadata_str(ACCOUNT_REFERENCE_ITEM);
		let order_id = reference
			.as_deref()
			.and_then(extract_order_id)
			.map(str::to_string);
		let receipt_number = callback.metadata_str(RECEIPT_NUMBER_ITEM);

		let result = if callback.is_success() {
			NoticeResult::Success
		} else {
			NoticeResult::Failure {
				code: callback.result_code,
				description: callback.result_desc.clone(),
			}
		};

		Ok(PaymentNotice {
			transaction_id: callback.checkout_request_id,
			reference,
			order_id,
			receipt_number,
			result,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn success_body(reference: &str) -> serde_json::Value {
		serde_json::json!({
			"Body": {
				"stkCallback": {
					"MerchantRequestID": "29115-34620561-1",
					"CheckoutRequestID": "ws_CO_191220191020363925",
					"ResultCode": 0,
					"ResultDesc": "The service request is processed successfully.",
					"CallbackMetadata": {
						"Item": [
							{ "Name": "Amount", "Value": 200.0 },
							{ "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
							{ "Name": "AccountReference", "Value": reference }
						]
					}
				}
			}
		})
	}

	#[test]
	fn test_parse_success_notice() {
		let notice = DarajaCorrelator::new()
			.parse(&success_body("Order-abc123"))
			.unwrap();

		assert!(notice.is_success());
		assert_eq!(notice.transaction_id, "ws_CO_191220191020363925");
		assert_eq!(notice.reference.as_deref(), Some("Order-abc123"));
		assert_eq!(notice.order_id.as_deref(), Some("abc123"));
		assert_eq!(notice.receipt_number.as_deref(), Some("NLJ7RT61SV"));
	}

	#[test]
	fn test_parse_failure_notice() {
		let body = serde_json::json!({
			"Body": {
				"stkCallback": {
					"MerchantRequestID": "29115-34620561-1",
					"CheckoutRequestID": "ws_CO_191220191020363925",
					"ResultCode": 1032,
					"ResultDesc": "Request cancelled by user"
				}
			}
		});
		let notice = DarajaCorrelator::new().parse(&body).unwrap();

		assert!(!notice.is_success());
		assert!(notice.order_id.is_none());
		assert!(matches!(
			notice.result,
			NoticeResult::Failure { code: 1032, .. }
		));
	}

	#[test]
	fn test_foreign_reference_yields_no_order_id() {
		let notice = DarajaCorrelator::new()
			.parse(&success_body("Invoice-999"))
			.unwrap();

		// The reference is preserved for logging, but no candidate id.
		assert_eq!(notice.reference.as_deref(), Some("Invoice-999"));
		assert!(notice.order_id.is_none());
	}

	#[test]
	fn test_invalid_shape_is_rejected() {
		let body = serde_json::json!({ "Body": {} });
		assert!(matches!(
			DarajaCorrelator::new().parse(&body),
			Err(SettlementError::InvalidShape(_))
		));
	}
}
