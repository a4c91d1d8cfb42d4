//! Payment API handlers.
//!
//! Initiation returns a tracking id or a classified error. The callback
//! receiver is asymmetric by design: once the body shape is valid, it
//! acknowledges receipt with a 2xx no matter the business outcome, because
//! the payment network retries rejected deliveries and a permanently
//! invalid payload cannot self-correct.

use crate::server::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use settler_auth::AuthError;
use settler_core::{CallbackDisposition, PaymentError};
use settler_gateway::GatewayError;
use settler_types::{
	ApiError, CallbackAck, CreatePaymentIntentRequest, CreatePaymentIntentResponse,
	InitiatePaymentRequest, InitiatePaymentResponse,
};

/// Handles POST /api/payments/initiate requests.
pub async fn initiate_payment(
	State(state): State<AppState>,
	Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, ApiError> {
	match state.engine.initiate_payment(&request).await {
		Ok(receipt) => Ok(Json(InitiatePaymentResponse {
			tracking_id: receipt.tracking_id,
			message: "Payment request accepted. Confirm on your phone.".to_string(),
		})),
		Err(e) => {
			tracing::warn!(order_id = %request.order_id, error = %e, "Initiation failed");
			Err(payment_error_to_api(e))
		},
	}
}

/// Handles POST /api/payments/callback requests from the payment network.
pub async fn receive_callback(
	State(state): State<AppState>,
	Json(body): Json<serde_json::Value>,
) -> Response {
	match state.engine.handle_callback(&body).await {
		Ok(CallbackDisposition::InvalidShape) => (
			StatusCode::BAD_REQUEST,
			Json(serde_json::json!({ "message": "Invalid callback format" })),
		)
			.into_response(),
		Ok(disposition) => {
			tracing::debug!(?disposition, "Callback acknowledged");
			(StatusCode::OK, Json(CallbackAck::received())).into_response()
		},
		Err(e) => {
			// Storage failed mid-processing; a redelivery can succeed, so
			// this is the one path that reports a server error upstream.
			tracing::error!(error = %e, "Callback processing failed");
			(
				StatusCode::INTERNAL_SERVER_ERROR,
				Json(serde_json::json!({ "message": "Callback processing failed" })),
			)
				.into_response()
		},
	}
}

/// Handles POST /api/payments/intent requests (synchronous card path).
pub async fn create_payment_intent(
	State(state): State<AppState>,
	Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
	match state.engine.create_payment_intent(request.amount).await {
		Ok(client_secret) => Ok(Json(CreatePaymentIntentResponse { client_secret })),
		Err(e) => {
			tracing::warn!(error = %e, "Payment intent creation failed");
			Err(crate::apis::orders::engine_error_to_api(e))
		},
	}
}

/// Maps initiation-path errors onto the stable API error set. Detailed
/// causes are already logged by the caller; clients get generic messages.
fn payment_error_to_api(e: PaymentError) -> ApiError {
	match e {
		PaymentError::OrderNotFound(id) => ApiError::NotFound {
			error_type: "order_not_found".to_string(),
			message: format!("Order {} does not exist", id),
		},
		PaymentError::NotPayable(id) => ApiError::UnprocessableEntity {
			error_type: "order_not_payable".to_string(),
			message: format!("Order {} is not awaiting payment", id),
		},
		PaymentError::Validation(message) => ApiError::BadRequest {
			error_type: "validation".to_string(),
			message,
		},
		PaymentError::Auth(AuthError::UpstreamRejected(_)) => ApiError::BadGateway {
			error_type: "upstream_auth_failed".to_string(),
			message: "Payment network authentication failed".to_string(),
		},
		PaymentError::Auth(AuthError::UpstreamUnavailable(_)) => ApiError::ServiceUnavailable {
			error_type: "upstream_unavailable".to_string(),
			message: "Unable to reach the payment network".to_string(),
			retry_after: Some(30),
		},
		PaymentError::Auth(AuthError::Configuration(_)) => ApiError::Internal {
			error_type: "internal".to_string(),
			message: "Internal server error".to_string(),
		},
		PaymentError::Gateway(gateway) => gateway_error_to_api(gateway),
		PaymentError::Storage(_) => ApiError::Internal {
			error_type: "internal".to_string(),
			message: "Internal server error".to_string(),
		},
	}
}

/// Maps gateway failure classes onto the stable API error set.
pub(crate) fn gateway_error_to_api(e: GatewayError) -> ApiError {
	match e {
		GatewayError::InvalidPhoneNumber(message) | GatewayError::InvalidAmount(message) => {
			ApiError::BadRequest {
				error_type: "validation".to_string(),
				message,
			}
		},
		GatewayError::InvalidRequest(_) => ApiError::BadRequest {
			error_type: "invalid_payment_request".to_string(),
			message: "Invalid payment request parameters".to_string(),
		},
		GatewayError::AuthFailed(_) => ApiError::BadGateway {
			error_type: "upstream_auth_failed".to_string(),
			message: "Payment network authentication failed".to_string(),
		},
		GatewayError::NetworkUnreachable(_) => ApiError::ServiceUnavailable {
			error_type: "upstream_unavailable".to_string(),
			message: "Unable to connect to the payment network".to_string(),
			retry_after: Some(30),
		},
		GatewayError::Unknown(_) => ApiError::BadGateway {
			error_type: "upstream_error".to_string(),
			message: "Failed to initiate payment".to_string(),
		},
		GatewayError::Configuration(_) => ApiError::Internal {
			error_type: "internal".to_string(),
			message: "Internal server error".to_string(),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validation_failures_map_to_400() {
		let api = payment_error_to_api(PaymentError::Gateway(GatewayError::InvalidPhoneNumber(
			"'12345' is not in a recognized format".to_string(),
		)));
		assert_eq!(api.status_code(), 400);

		let api = payment_error_to_api(PaymentError::Validation("bad".to_string()));
		assert_eq!(api.status_code(), 400);
	}

	#[test]
	fn test_upstream_failures_map_to_5xx() {
		let api = payment_error_to_api(PaymentError::Gateway(GatewayError::AuthFailed(
			"401".to_string(),
		)));
		assert_eq!(api.status_code(), 502);

		let api = payment_error_to_api(PaymentError::Gateway(GatewayError::NetworkUnreachable(
			"timeout".to_string(),
		)));
		assert_eq!(api.status_code(), 503);
		assert_eq!(api.to_error_response().retry_after, Some(30));
	}

	#[test]
	fn test_missing_order_maps_to_404() {
		let api = payment_error_to_api(PaymentError::OrderNotFound("o1".to_string()));
		assert_eq!(api.status_code(), 404);
	}

	#[test]
	fn test_upstream_detail_is_not_leaked() {
		let api = payment_error_to_api(PaymentError::Gateway(GatewayError::AuthFailed(
			"secret-internal-detail".to_string(),
		)));
		assert!(!api.to_error_response().message.contains("secret-internal-detail"));
	}
}
