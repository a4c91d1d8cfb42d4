//! API handlers for the settlement engine HTTP surface.

pub mod orders;
pub mod payments;

use crate::server::AppState;
use axum::extract::State;
use axum::response::Json;

/// Handles GET /api/health requests.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
	Json(serde_json::json!({
		"status": "ok",
		"settler": state.engine.config().settler.id,
	}))
}
