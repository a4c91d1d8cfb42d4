//! Synchronous card payment client.
//!
//! The card path has no correlation problem: one authenticated round trip
//! creates a payment intent and the provider returns a client secret for
//! the frontend to confirm. Kept to its interface; settlement of card
//! payments is not driven by this engine.

use crate::{CardGatewayInterface, GatewayError};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use settler_types::SecretString;
use std::time::Duration;

/// Card payment-intent client.
pub struct CardGateway {
	http: reqwest::Client,
	api_url: String,
	secret_key: SecretString,
}

impl CardGateway {
	/// Creates a client for the given provider API and secret key.
	pub fn new(
		api_url: impl Into<String>,
		secret_key: SecretString,
		timeout: Duration,
	) -> Result<Self, GatewayError> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			http,
			api_url: api_url.into(),
			secret_key,
		})
	}
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
	client_secret: String,
}

#[async_trait]
impl CardGatewayInterface for CardGateway {
	async fn create_payment_intent(&self, amount: Decimal) -> Result<String, GatewayError> {
		// The provider wants the amount in the currency's minor unit.
		let minor_units = (amount * Decimal::from(100))
			.round()
			.to_u64()
			.filter(|n| *n > 0)
			.ok_or_else(|| {
				GatewayError::InvalidAmount(format!("amount must be positive, got {}", amount))
			})?;

		let url = format!("{}/v1/payment_intents", self.api_url.trim_end_matches('/'));
		let response = self
			.http
			.post(&url)
			.bearer_auth(self.secret_key.expose())
			.form(&[
				("amount", minor_units.to_string()),
				("currency", "kes".to_string()),
			])
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() || e.is_connect() {
					GatewayError::NetworkUnreachable(e.to_string())
				} else {
					GatewayError::Unknown(e.to_string())
				}
			})?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(status = %status, body = %body, "Payment intent rejected");
			return Err(match status.as_u16() {
				401 | 403 => GatewayError::AuthFailed(format!("provider returned {}", status)),
				400..=499 => GatewayError::InvalidRequest(format!("provider returned {}", status)),
				_ => GatewayError::Unknown(format!("provider returned {}", status)),
			});
		}

		let intent: PaymentIntentResponse = response
			.json()
			.await
			.map_err(|e| GatewayError::Unknown(format!("malformed provider response: {}", e)))?;

		Ok(intent.client_secret)
	}
}
