//! Daraja OAuth token provider.
//!
//! Obtains an access token from the payment network's
//! `oauth/v1/generate?grant_type=client_credentials` endpoint using HTTP
//! basic authentication over the consumer key and secret.

use crate::{AccessToken, AuthError, TokenProviderInterface};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use settler_types::SecretString;
use std::time::Duration;

/// Token provider backed by the Daraja OAuth endpoint.
pub struct DarajaTokenProvider {
	http: reqwest::Client,
	api_url: String,
	consumer_key: SecretString,
	consumer_secret: SecretString,
}

impl DarajaTokenProvider {
	/// Creates a provider for the given API base URL and credentials.
	///
	/// The timeout applies to the whole token request; a timeout is a
	/// transient failure, not a credential problem.
	pub fn new(
		api_url: impl Into<String>,
		consumer_key: SecretString,
		consumer_secret: SecretString,
		timeout: Duration,
	) -> Result<Self, AuthError> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AuthError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			http,
			api_url: api_url.into(),
			consumer_key,
			consumer_secret,
		})
	}
}

/// Wire shape of the token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	// The network returns the lifetime as a decimal string.
	#[serde(deserialize_with = "deserialize_expires_in")]
	expires_in: u64,
}

fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum StringOrNumber {
		String(String),
		Number(u64),
	}

	match StringOrNumber::deserialize(deserializer)? {
		StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
		StringOrNumber::Number(n) => Ok(n),
	}
}

#[async_trait]
impl TokenProviderInterface for DarajaTokenProvider {
	async fn fetch_token(&self) -> Result<AccessToken, AuthError> {
		let url = format!(
			"{}/oauth/v1/generate?grant_type=client_credentials",
			self.api_url.trim_end_matches('/')
		);

		let response = self
			.http
			.get(&url)
			.basic_auth(
				self.consumer_key.expose(),
				Some(self.consumer_secret.expose()),
			)
			.send()
			.await
			.map_err(|e| AuthError::UpstreamUnavailable(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(status = %status, body = %body, "Token request rejected");
			return if status.is_client_error() {
				Err(AuthError::UpstreamRejected(format!(
					"token endpoint returned {}",
					status
				)))
			} else {
				Err(AuthError::UpstreamUnavailable(format!(
					"token endpoint returned {}",
					status
				)))
			};
		}

		let token: TokenResponse = response
			.json()
			.await
			.map_err(|e| AuthError::UpstreamUnavailable(format!("malformed token response: {}", e)))?;

		tracing::debug!(expires_in = token.expires_in, "Access token acquired");

		Ok(AccessToken {
			token: SecretString::new(token.access_token),
			expires_in: token.expires_in,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_token_response_accepts_string_lifetime() {
		let parsed: TokenResponse =
			serde_json::from_str(r#"{"access_token": "abc", "expires_in": "3599"}"#).unwrap();
		assert_eq!(parsed.access_token, "abc");
		assert_eq!(parsed.expires_in, 3599);
	}

	#[test]
	fn test_token_response_accepts_numeric_lifetime() {
		let parsed: TokenResponse =
			serde_json::from_str(r#"{"access_token": "abc", "expires_in": 3599}"#).unwrap();
		assert_eq!(parsed.expires_in, 3599);
	}

	#[test]
	fn test_token_response_rejects_garbage_lifetime() {
		let result: Result<TokenResponse, _> =
			serde_json::from_str(r#"{"access_token": "abc", "expires_in": "soon"}"#);
		assert!(result.is_err());
	}
}
