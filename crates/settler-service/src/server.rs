//! HTTP server for the settlement engine API.
//!
//! Exposes order creation and retrieval, payment initiation, the payment
//! network's callback receiver, and the synchronous card payment path.
//! The callback route is unauthenticated at the transport level (the
//! network signs nothing), so it trusts payload correctness only and
//! never caller identity.

use axum::{
	extract::DefaultBodyLimit,
	routing::{get, post},
	Router,
};
use settler_config::ApiConfig;
use settler_core::SettlerEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the engine for processing requests.
	pub engine: Arc<SettlerEngine>,
}

/// Starts the HTTP server.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<SettlerEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { engine };

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/health", get(crate::apis::health))
				.route("/orders", post(crate::apis::orders::create_order))
				.route("/orders/{id}", get(crate::apis::orders::get_order))
				.route(
					"/payments/initiate",
					post(crate::apis::payments::initiate_payment),
				)
				.route(
					"/payments/callback",
					post(crate::apis::payments::receive_callback),
				)
				.route(
					"/payments/intent",
					post(crate::apis::payments::create_payment_intent),
				),
		)
		.layer(DefaultBodyLimit::max(api_config.max_request_size))
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Settler API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}
