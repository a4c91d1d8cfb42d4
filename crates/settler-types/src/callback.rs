//! Inbound payment-network callback envelope.
//!
//! The payment network posts a JSON body shaped `Body.stkCallback.{..}`
//! carrying a result code, a description, and (on success) a metadata item
//! list. These types mirror the wire format exactly; interpretation of the
//! result and correlation of the reference live in the correlator.

use serde::{Deserialize, Serialize};

/// Wire name of the metadata item carrying the correlation reference.
pub const ACCOUNT_REFERENCE_ITEM: &str = "AccountReference";

/// Wire name of the metadata item carrying the network receipt number.
pub const RECEIPT_NUMBER_ITEM: &str = "MpesaReceiptNumber";

/// Top-level callback envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackEnvelope {
	#[serde(rename = "Body")]
	pub body: CallbackBody,
}

/// Wrapper object around the callback payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackBody {
	#[serde(rename = "stkCallback")]
	pub stk_callback: StkCallback,
}

/// The callback payload proper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallback {
	/// Request id assigned by the network's merchant gateway.
	#[serde(rename = "MerchantRequestID", default)]
	pub merchant_request_id: Option<String>,
	/// Tracking id returned by the initiation leg; the network's
	/// transaction identifier for this payment attempt.
	#[serde(rename = "CheckoutRequestID")]
	pub checkout_request_id: String,
	/// Zero for a completed payment, non-zero otherwise.
	#[serde(rename = "ResultCode")]
	pub result_code: i64,
	/// Human-readable description of the result.
	#[serde(rename = "ResultDesc")]
	pub result_desc: String,
	/// Present on successful payments.
	#[serde(rename = "CallbackMetadata", skip_serializing_if = "Option::is_none")]
	pub metadata: Option<CallbackMetadata>,
}

/// Metadata item list delivered with successful payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackMetadata {
	#[serde(rename = "Item", default)]
	pub items: Vec<MetadataItem>,
}

/// A single name/value metadata entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataItem {
	#[serde(rename = "Name")]
	pub name: String,
	#[serde(rename = "Value", skip_serializing_if = "Option::is_none")]
	pub value: Option<serde_json::Value>,
}

impl StkCallback {
	/// True when the network reports the payment as completed.
	pub fn is_success(&self) -> bool {
		self.result_code == 0
	}

	/// Looks up a metadata item value by its wire name.
	pub fn metadata_value(&self, name: &str) -> Option<&serde_json::Value> {
		self.metadata
			.as_ref()?
			.items
			.iter()
			.find(|item| item.name == name)
			.and_then(|item| item.value.as_ref())
	}

	/// Metadata item value rendered as a string.
	///
	/// The network is inconsistent about value types (amounts arrive as
	/// numbers, references as strings), so both are accepted.
	pub fn metadata_str(&self, name: &str) -> Option<String> {
		match self.metadata_value(name)? {
			serde_json::Value::String(s) => Some(s.clone()),
			serde_json::Value::Number(n) => Some(n.to_string()),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn success_body() -> serde_json::Value {
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
							{ "Name": "AccountReference", "Value": "Order-abc123" },
							{ "Name": "PhoneNumber", "Value": 254712345678u64 }
						]
					}
				}
			}
		})
	}

	#[test]
	fn test_parse_success_callback() {
		let envelope: CallbackEnvelope = serde_json::from_value(success_body()).unwrap();
		let callback = envelope.body.stk_callback;
		assert!(callback.is_success());
		assert_eq!(callback.checkout_request_id, "ws_CO_191220191020363925");
		assert_eq!(
			callback.metadata_str(ACCOUNT_REFERENCE_ITEM).as_deref(),
			Some("Order-abc123")
		);
		assert_eq!(
			callback.metadata_str(RECEIPT_NUMBER_ITEM).as_deref(),
			Some("NLJ7RT61SV")
		);
	}

	#[test]
	fn test_parse_failure_callback_without_metadata() {
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
		let envelope: CallbackEnvelope = serde_json::from_value(body).unwrap();
		let callback = envelope.body.stk_callback;
		assert!(!callback.is_success());
		assert!(callback.metadata_str(ACCOUNT_REFERENCE_ITEM).is_none());
	}

	#[test]
	fn test_numeric_metadata_value_renders_as_string() {
		let envelope: CallbackEnvelope = serde_json::from_value(success_body()).unwrap();
		let callback = envelope.body.stk_callback;
		assert_eq!(
			callback.metadata_str("PhoneNumber").as_deref(),
			Some("254712345678")
		);
	}

	#[test]
	fn test_malformed_envelope_is_rejected() {
		let body = serde_json::json!({ "Body": { "unexpected": true } });
		assert!(serde_json::from_value::<CallbackEnvelope>(body).is_err());
	}
}
