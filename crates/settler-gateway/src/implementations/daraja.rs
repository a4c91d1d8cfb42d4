//! Daraja STK Push initiation client.
//!
//! Delivers the built payload to the network's
//! `mpesa/stkpush/v1/processrequest` endpoint and classifies failures so
//! the caller can tell terminal rejections from transient outages.

use crate::{GatewayError, GatewayInterface, InitiationReceipt, StkPushRequest};
use async_trait::async_trait;
use serde::Deserialize;
use settler_types::SecretString;
use std::time::Duration;

/// STK Push client backed by the Daraja API.
pub struct DarajaGateway {
	http: reqwest::Client,
	api_url: String,
}

impl DarajaGateway {
	/// Creates a client for the given API base URL.
	pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| GatewayError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			http,
			api_url: api_url.into(),
		})
	}

	fn classify_transport(e: reqwest::Error) -> GatewayError {
		if e.is_timeout() || e.is_connect() {
			GatewayError::NetworkUnreachable(e.to_string())
		} else {
			GatewayError::Unknown(e.to_string())
		}
	}
}

/// Wire shape of an accepted initiation response.
#[derive(Debug, Deserialize)]
struct StkPushResponse {
	#[serde(rename = "MerchantRequestID")]
	merchant_request_id: Option<String>,
	#[serde(rename = "CheckoutRequestID")]
	checkout_request_id: String,
	#[serde(rename = "ResponseCode")]
	response_code: String,
	#[serde(rename = "ResponseDescription", default)]
	response_description: String,
}

#[async_trait]
impl GatewayInterface for DarajaGateway {
	async fn initiate(
		&self,
		token: &SecretString,
		request: &StkPushRequest,
	) -> Result<InitiationReceipt, GatewayError> {
		let url = format!(
			"{}/mpesa/stkpush/v1/processrequest",
			self.api_url.trim_end_matches('/')
		);

		let response = self
			.http
			.post(&url)
			.bearer_auth(token.expose())
			.json(request)
			.send()
			.await
			.map_err(Self::classify_transport)?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(status = %status, body = %body, "Initiation rejected");

			return Err(match status.as_u16() {
				401 | 403 => GatewayError::AuthFailed(format!("initiation returned {}", status)),
				400..=499 => GatewayError::InvalidRequest(format!("initiation returned {}", status)),
				_ => GatewayError::Unknown(format!("initiation returned {}", status)),
			});
		}

		let accepted: StkPushResponse = response
			.json()
			.await
			.map_err(|e| GatewayError::Unknown(format!("malformed initiation response: {}", e)))?;

		// A 2xx body can still carry a non-zero response code.
		if accepted.response_code.trim() != "0" {
			return Err(GatewayError::InvalidRequest(format!(
				"initiation not accepted: code {} ({})",
				accepted.response_code, accepted.response_description
			)));
		}

		tracing::info!(
			tracking_id = %accepted.checkout_request_id,
			"Initiation accepted by payment network"
		);

		Ok(InitiationReceipt {
			tracking_id: accepted.checkout_request_id,
			merchant_request_id: accepted.merchant_request_id,
			description: accepted.response_description,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_response_parses_accepted_body() {
		let body = r#"{
			"MerchantRequestID": "29115-34620561-1",
			"CheckoutRequestID": "ws_CO_191220191020363925",
			"ResponseCode": "0",
			"ResponseDescription": "Success. Request accepted for processing",
			"CustomerMessage": "Success. Request accepted for processing"
		}"#;
		let parsed: StkPushResponse = serde_json::from_str(body).unwrap();
		assert_eq!(parsed.checkout_request_id, "ws_CO_191220191020363925");
		assert_eq!(parsed.response_code, "0");
	}

	#[test]
	fn test_response_tolerates_missing_description() {
		let body = r#"{
			"CheckoutRequestID": "ws_CO_1",
			"ResponseCode": "0"
		}"#;
		let parsed: StkPushResponse = serde_json::from_str(body).unwrap();
		assert!(parsed.merchant_request_id.is_none());
		assert_eq!(parsed.response_description, "");
	}
}
