//! Credential and token management for the settlement engine.
//!
//! The payment network authenticates initiation requests with a short-lived
//! OAuth access token derived from static application credentials. This
//! crate obtains that token and caches it bounded by its advertised expiry,
//! so a stale token is never sent. Missing credentials never reach this
//! crate: configuration validation rejects them at startup.

use async_trait::async_trait;
use settler_types::SecretString;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Re-export implementations
pub mod implementations {
	pub mod daraja;
}

/// Margin subtracted from a token's advertised lifetime before it is
/// considered stale. Covers clock skew and request latency.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Errors that can occur during token acquisition.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The network rejected the credentials or the request (terminal for
	/// this attempt; not retried).
	#[error("Upstream rejected token request: {0}")]
	UpstreamRejected(String),
	/// The network could not be reached or answered unusably (transient).
	#[error("Upstream unavailable: {0}")]
	UpstreamUnavailable(String),
	/// The provider could not be constructed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A time-bounded access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
	/// The bearer token value.
	pub token: SecretString,
	/// Advertised lifetime in seconds.
	pub expires_in: u64,
}

/// Trait defining the interface for token providers.
#[async_trait]
pub trait TokenProviderInterface: Send + Sync {
	/// Obtains a fresh access token from the payment network.
	async fn fetch_token(&self) -> Result<AccessToken, AuthError>;
}

struct CachedToken {
	token: SecretString,
	stale_at: Instant,
}

/// Service that manages access tokens.
///
/// Wraps a provider and caches its tokens until shortly before expiry; a
/// token is never handed out past `expires_in` minus the safety margin.
pub struct AuthService {
	provider: Box<dyn TokenProviderInterface>,
	cache: RwLock<Option<CachedToken>>,
}

impl AuthService {
	/// Creates a new AuthService with the specified provider.
	pub fn new(provider: Box<dyn TokenProviderInterface>) -> Self {
		Self {
			provider,
			cache: RwLock::new(None),
		}
	}

	/// Returns a valid access token, fetching a new one when the cached
	/// token is absent or about to expire.
	pub async fn access_token(&self) -> Result<SecretString, AuthError> {
		{
			let cache = self.cache.read().await;
			if let Some(cached) = cache.as_ref() {
				if Instant::now() < cached.stale_at {
					return Ok(cached.token.clone());
				}
			}
		}

		let mut cache = self.cache.write().await;
		// Another caller may have refreshed while we waited for the lock.
		if let Some(cached) = cache.as_ref() {
			if Instant::now() < cached.stale_at {
				return Ok(cached.token.clone());
			}
		}

		let fresh = self.provider.fetch_token().await?;
		let lifetime = Duration::from_secs(fresh.expires_in);
		let usable = lifetime.checked_sub(EXPIRY_MARGIN).unwrap_or(Duration::ZERO);

		let token = fresh.token.clone();
		if usable.is_zero() {
			// Token too short-lived to cache; hand it out once.
			tracing::debug!(
				expires_in = fresh.expires_in,
				"Access token lifetime below cache margin, not caching"
			);
			*cache = None;
		} else {
			*cache = Some(CachedToken {
				token: fresh.token,
				stale_at: Instant::now() + usable,
			});
		}

		Ok(token)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	struct CountingProvider {
		calls: AtomicU32,
		expires_in: u64,
	}

	#[async_trait]
	impl TokenProviderInterface for CountingProvider {
		async fn fetch_token(&self) -> Result<AccessToken, AuthError> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			Ok(AccessToken {
				token: SecretString::from(format!("token-{}", n).as_str()),
				expires_in: self.expires_in,
			})
		}
	}

	#[tokio::test]
	async fn test_token_is_cached_within_lifetime() {
		let service = AuthService::new(Box::new(CountingProvider {
			calls: AtomicU32::new(0),
			expires_in: 3600,
		}));

		let first = service.access_token().await.unwrap();
		let second = service.access_token().await.unwrap();
		assert_eq!(first.expose(), "token-1");
		assert_eq!(second.expose(), "token-1");
	}

	#[tokio::test]
	async fn test_short_lived_token_not_cached() {
		// Lifetime below the margin: every call must fetch fresh.
		let service = AuthService::new(Box::new(CountingProvider {
			calls: AtomicU32::new(0),
			expires_in: 30,
		}));

		let first = service.access_token().await.unwrap();
		let second = service.access_token().await.unwrap();
		assert_eq!(first.expose(), "token-1");
		assert_eq!(second.expose(), "token-2");
	}

	#[tokio::test]
	async fn test_provider_error_propagates() {
		struct FailingProvider;

		#[async_trait]
		impl TokenProviderInterface for FailingProvider {
			async fn fetch_token(&self) -> Result<AccessToken, AuthError> {
				Err(AuthError::UpstreamRejected("invalid credentials".to_string()))
			}
		}

		let service = AuthService::new(Box::new(FailingProvider));
		assert!(matches!(
			service.access_token().await,
			Err(AuthError::UpstreamRejected(_))
		));
	}
}
