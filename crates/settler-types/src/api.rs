//! API types for the settlement engine HTTP surface.
//!
//! Request and response bodies exchanged with clients and with the payment
//! network's callback delivery, plus the structured API error that maps
//! engine failures onto a small stable set of HTTP responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request to create an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
	#[serde(rename = "buyerId")]
	pub buyer_id: String,
	#[serde(rename = "buyerEmail", skip_serializing_if = "Option::is_none")]
	pub buyer_email: Option<String>,
	#[serde(rename = "lineItems")]
	pub line_items: Vec<LineItemRequest>,
	#[serde(rename = "shippingAddress")]
	pub shipping_address: String,
}

/// A requested product line: product reference, quantity, and the unit
/// price snapshot taken by the catalog collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRequest {
	#[serde(rename = "productId")]
	pub product_id: String,
	pub quantity: u32,
	#[serde(rename = "unitPrice")]
	pub unit_price: Decimal,
}

/// Request to initiate a mobile payment for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
	pub amount: Decimal,
	#[serde(rename = "phoneNumber")]
	pub phone_number: String,
	#[serde(rename = "orderId")]
	pub order_id: String,
}

/// Response to an accepted payment initiation.
///
/// Acceptance means the network took the request for processing. The
/// payment outcome arrives later through the callback; the order is not
/// mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
	#[serde(rename = "trackingId")]
	pub tracking_id: String,
	pub message: String,
}

/// Acknowledgment returned to the payment network for a processed callback.
///
/// The acknowledgment communicates receipt, not business success: it is
/// returned even when the payment failed or the referenced order does not
/// exist, so the network does not retry a delivery that cannot self-correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackAck {
	#[serde(rename = "ResultCode")]
	pub result_code: i64,
	#[serde(rename = "ResultDesc")]
	pub result_desc: String,
}

impl CallbackAck {
	/// Acknowledges receipt of a syntactically valid callback.
	pub fn received() -> Self {
		Self {
			result_code: 0,
			result_desc: "Callback received".to_string(),
		}
	}
}

/// Request for the synchronous card payment path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
	pub amount: Decimal,
}

/// Client secret handed back by the card payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntentResponse {
	#[serde(rename = "clientSecret")]
	pub client_secret: String,
}

/// JSON error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable error type identifier.
	pub error: String,
	/// User-safe description.
	pub message: String,
	/// Suggested retry delay in seconds, for transient failures.
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error with HTTP status mapping.
///
/// Technical detail (upstream bodies, transport errors) is logged at the
/// call site; clients only ever see the message carried here.
#[derive(Debug)]
pub enum ApiError {
	/// Request validation failed (400).
	BadRequest { error_type: String, message: String },
	/// Referenced entity does not exist (404).
	NotFound { error_type: String, message: String },
	/// Well-formed request that cannot be processed (422).
	UnprocessableEntity { error_type: String, message: String },
	/// The upstream payment network rejected the attempt (502).
	BadGateway { error_type: String, message: String },
	/// The upstream payment network is unreachable (503).
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Internal failure (500).
	Internal { error_type: String, message: String },
}

impl ApiError {
	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::NotFound { .. } => 404,
			ApiError::UnprocessableEntity { .. } => 422,
			ApiError::BadGateway { .. } => 502,
			ApiError::ServiceUnavailable { .. } => 503,
			ApiError::Internal { .. } => 500,
		}
	}

	/// Converts to the JSON error body.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			ApiError::BadRequest { error_type, message }
			| ApiError::NotFound { error_type, message }
			| ApiError::UnprocessableEntity { error_type, message }
			| ApiError::BadGateway { error_type, message }
			| ApiError::Internal { error_type, message } => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				retry_after: None,
			},
			ApiError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				retry_after: *retry_after,
			},
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			ApiError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			ApiError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			ApiError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
			ApiError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			ApiError::Internal { message, .. } => write!(f, "Internal Server Error: {}", message),
		}
	}
}

impl std::error::Error for ApiError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		let err = ApiError::ServiceUnavailable {
			error_type: "upstream_unavailable".to_string(),
			message: "Unable to reach the payment network".to_string(),
			retry_after: Some(30),
		};
		assert_eq!(err.status_code(), 503);
		let body = err.to_error_response();
		assert_eq!(body.error, "upstream_unavailable");
		assert_eq!(body.retry_after, Some(30));
	}

	#[test]
	fn test_callback_ack_wire_shape() {
		let ack = serde_json::to_value(CallbackAck::received()).unwrap();
		assert_eq!(ack["ResultCode"], 0);
		assert!(ack["ResultDesc"].is_string());
	}
}
