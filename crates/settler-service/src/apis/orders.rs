//! Order API handlers.
//!
//! Order creation and retrieval. These sit at the edge of this engine's
//! ownership: orders are created here in `pending` state and read back by
//! clients polling for settlement.

use crate::server::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use settler_core::EngineError;
use settler_types::{ApiError, CreateOrderRequest, Order};

/// Handles POST /api/orders requests.
pub async fn create_order(
	State(state): State<AppState>,
	Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
	match state.engine.create_order(request).await {
		Ok(order) => Ok((StatusCode::CREATED, Json(order))),
		Err(e) => {
			tracing::warn!(error = %e, "Order creation failed");
			Err(engine_error_to_api(e))
		},
	}
}

/// Handles GET /api/orders/{id} requests.
pub async fn get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Order>, ApiError> {
	match state.engine.get_order(&id).await {
		Ok(order) => Ok(Json(order)),
		Err(e) => Err(engine_error_to_api(e)),
	}
}

/// Maps engine errors onto the stable API error set.
pub(crate) fn engine_error_to_api(e: EngineError) -> ApiError {
	match e {
		EngineError::Validation(message) => ApiError::BadRequest {
			error_type: "validation".to_string(),
			message,
		},
		EngineError::NotFound(id) => ApiError::NotFound {
			error_type: "order_not_found".to_string(),
			message: format!("Order {} does not exist", id),
		},
		EngineError::CardNotConfigured => ApiError::ServiceUnavailable {
			error_type: "card_not_configured".to_string(),
			message: "Card payments are not available".to_string(),
			retry_after: None,
		},
		EngineError::Gateway(gateway) => crate::apis::payments::gateway_error_to_api(gateway),
		EngineError::Config(_) | EngineError::Service(_) => ApiError::Internal {
			error_type: "internal".to_string(),
			message: "Internal server error".to_string(),
		},
	}
}
