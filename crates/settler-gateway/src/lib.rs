//! Payment network gateway for the settlement engine.
//!
//! This crate owns the outbound legs of the payment protocol: building the
//! initiation payload (a pure function of its inputs) and delivering it to
//! the network with a classified result. Initiation success means "the
//! request was accepted for processing"; the payment outcome only ever
//! arrives through the callback, so nothing here touches order state.

use async_trait::async_trait;
use rust_decimal::Decimal;
use settler_types::SecretString;
use std::time::Duration;
use thiserror::Error;

pub mod request;

/// Re-export implementations
pub mod implementations {
	pub mod card;
	pub mod daraja;
}

pub use request::{build_stk_push, format_timestamp, normalize_phone, password_digest, StkPushRequest};

/// Errors that can occur while building or delivering payment requests.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// The phone number could not be normalized to international form.
	#[error("Invalid phone number: {0}")]
	InvalidPhoneNumber(String),
	/// The amount is non-positive or not representable.
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	/// The network rejected our credentials. Terminal; retrying cannot help.
	#[error("Payment network rejected credentials: {0}")]
	AuthFailed(String),
	/// The network rejected the payload. Terminal; surfaced to the caller
	/// for correction.
	#[error("Payment network rejected request: {0}")]
	InvalidRequest(String),
	/// The network could not be reached in time. Transient.
	#[error("Payment network unreachable: {0}")]
	NetworkUnreachable(String),
	/// Anything unclassified; treated conservatively as transient.
	#[error("Unexpected payment network failure: {0}")]
	Unknown(String),
	/// The gateway could not be constructed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl GatewayError {
	/// True for failure classes where another attempt can succeed.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			GatewayError::NetworkUnreachable(_) | GatewayError::Unknown(_)
		)
	}
}

/// Receipt returned by the network when it accepts an initiation request.
#[derive(Debug, Clone)]
pub struct InitiationReceipt {
	/// Tracking id assigned by the network; echoed in the callback as the
	/// transaction identifier.
	pub tracking_id: String,
	/// Request id assigned by the network's merchant gateway.
	pub merchant_request_id: Option<String>,
	/// Human-readable acceptance description.
	pub description: String,
}

/// Trait defining the interface for payment initiation gateways.
#[async_trait]
pub trait GatewayInterface: Send + Sync {
	/// Sends an initiation request with the given bearer token.
	async fn initiate(
		&self,
		token: &SecretString,
		request: &StkPushRequest,
	) -> Result<InitiationReceipt, GatewayError>;
}

/// Trait defining the interface for the synchronous card payment path.
///
/// One round trip, no callback correlation: the provider hands back a
/// client secret the frontend uses to confirm the payment itself.
#[async_trait]
pub trait CardGatewayInterface: Send + Sync {
	/// Creates a payment intent and returns its client secret.
	async fn create_payment_intent(&self, amount: Decimal) -> Result<String, GatewayError>;
}

/// Service that delivers initiation requests with bounded retry.
///
/// Only transient failure classes are retried, a bounded number of times
/// with a growing delay. Terminal classes (`AuthFailed`, `InvalidRequest`)
/// surface immediately.
pub struct GatewayService {
	gateway: Box<dyn GatewayInterface>,
	max_attempts: u32,
}

impl GatewayService {
	/// Creates a new GatewayService. `max_attempts` counts the first try.
	pub fn new(gateway: Box<dyn GatewayInterface>, max_attempts: u32) -> Self {
		Self {
			gateway,
			max_attempts: max_attempts.max(1),
		}
	}

	/// Sends an initiation request, retrying transient failures.
	pub async fn initiate(
		&self,
		token: &SecretString,
		request: &StkPushRequest,
	) -> Result<InitiationReceipt, GatewayError> {
		let mut attempt = 1;
		loop {
			match self.gateway.initiate(token, request).await {
				Ok(receipt) => return Ok(receipt),
				Err(e) if e.is_transient() && attempt < self.max_attempts => {
					let delay = Duration::from_millis(250 * 2u64.pow(attempt - 1));
					tracing::warn!(
						attempt,
						max_attempts = self.max_attempts,
						error = %e,
						"Transient initiation failure, retrying"
					);
					tokio::time::sleep(delay).await;
					attempt += 1;
				},
				Err(e) => return Err(e),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	struct FlakyGateway {
		calls: AtomicU32,
		fail_first: u32,
		error: fn() -> GatewayError,
	}

	#[async_trait]
	impl GatewayInterface for FlakyGateway {
		async fn initiate(
			&self,
			_token: &SecretString,
			_request: &StkPushRequest,
		) -> Result<InitiationReceipt, GatewayError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			if n <= self.fail_first {
				Err((self.error)())
			} else {
				Ok(InitiationReceipt {
					tracking_id: "ws_CO_1".to_string(),
					merchant_request_id: None,
					description: "Accepted".to_string(),
				})
			}
		}
	}

	fn sample_request() -> StkPushRequest {
		build_stk_push(
			"174379",
			"passkey",
			rust_decimal::Decimal::from(200),
			"0712345678",
			"order-1",
			"https://shop.example.com/api/payments/callback",
			chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn test_transient_failure_is_retried() {
		let service = GatewayService::new(
			Box::new(FlakyGateway {
				calls: AtomicU32::new(0),
				fail_first: 2,
				error: || GatewayError::NetworkUnreachable("connect timeout".to_string()),
			}),
			3,
		);

		let receipt = service
			.initiate(&SecretString::from("token"), &sample_request())
			.await
			.unwrap();
		assert_eq!(receipt.tracking_id, "ws_CO_1");
	}

	#[tokio::test]
	async fn test_retries_are_bounded() {
		let service = GatewayService::new(
			Box::new(FlakyGateway {
				calls: AtomicU32::new(0),
				fail_first: 10,
				error: || GatewayError::NetworkUnreachable("connect timeout".to_string()),
			}),
			2,
		);

		let result = service
			.initiate(&SecretString::from("token"), &sample_request())
			.await;
		assert!(matches!(result, Err(GatewayError::NetworkUnreachable(_))));
	}

	#[tokio::test]
	async fn test_terminal_failure_is_not_retried() {
		let gateway = FlakyGateway {
			calls: AtomicU32::new(0),
			fail_first: 10,
			error: || GatewayError::AuthFailed("401".to_string()),
		};
		let service = GatewayService::new(Box::new(gateway), 3);

		let result = service
			.initiate(&SecretString::from("token"), &sample_request())
			.await;
		assert!(matches!(result, Err(GatewayError::AuthFailed(_))));
	}
}
