//! Configuration module for the settlement engine.
//!
//! Configuration is loaded from TOML files with `${ENV_VAR}` /
//! `${ENV_VAR:-default}` placeholders resolved from the environment before
//! parsing, so payment-network credentials stay out of the files themselves.
//! Missing credentials are a startup error: validation runs at load time,
//! before any network call is attempted.
//!
//! Configurations can be split into multiple files with
//! `include = ["file1.toml", "file2.toml"]`; each top-level section must be
//! unique across all files.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use settler_types::SecretString;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the settlement engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity and public URL of this engine instance.
	pub settler: SettlerConfig,
	/// Payment network (STK Push) credentials and endpoints.
	pub mpesa: MpesaConfig,
	/// Synchronous card payment provider; optional.
	pub card: Option<CardConfig>,
	/// Storage backend selection and per-backend configuration.
	pub storage: StorageConfig,
	/// Receipt notifier selection and per-notifier configuration.
	pub notifier: NotifierConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Identity of this engine instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettlerConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
	/// Externally reachable base URL; the payment network posts callbacks
	/// to a path under it, so it must be routable from the internet.
	pub base_url: String,
}

/// Credentials and endpoints for the mobile payment network.
///
/// The credential values normally arrive through `${ENV_VAR}` placeholders
/// (`MPESA_CONSUMER_KEY`, `MPESA_CONSUMER_SECRET`, `MPESA_SHORTCODE`,
/// `MPESA_PASSKEY`); a placeholder without a default fails the load when
/// the variable is unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MpesaConfig {
	/// OAuth consumer key.
	pub consumer_key: SecretString,
	/// OAuth consumer secret.
	pub consumer_secret: SecretString,
	/// Merchant shortcode (till/paybill number).
	pub shortcode: String,
	/// Passkey used in the initiation password digest.
	pub passkey: SecretString,
	/// Base URL of the payment network API.
	#[serde(default = "default_mpesa_api_url")]
	pub api_url: String,
	/// Timeout for token acquisition, seconds.
	#[serde(default = "default_token_timeout_secs")]
	pub token_timeout_secs: u64,
	/// Timeout for the initiation request, seconds.
	#[serde(default = "default_initiation_timeout_secs")]
	pub initiation_timeout_secs: u64,
	/// Maximum initiation attempts for transient failures.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
}

fn default_mpesa_api_url() -> String {
	"https://sandbox.safaricom.co.ke".to_string()
}

fn default_token_timeout_secs() -> u64 {
	5
}

fn default_initiation_timeout_secs() -> u64 {
	10
}

fn default_max_attempts() -> u32 {
	3
}

/// Configuration for the synchronous card payment provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardConfig {
	/// Provider API secret key.
	pub secret_key: SecretString,
	/// Base URL of the provider API.
	pub api_url: String,
	/// Request timeout, seconds.
	#[serde(default = "default_card_timeout_secs")]
	pub timeout_secs: u64,
}

fn default_card_timeout_secs() -> u64 {
	10
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for receipt notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of notifier implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes. Callback payloads from the
	/// payment network can be large, so the default is generous.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_max_request_size() -> usize {
	10 * 1024 * 1024
}

/// Resolves `${VAR}` and `${VAR:-default}` placeholders against the
/// process environment. A placeholder without a default whose variable is
/// unset fails the load; this is how missing credentials surface at
/// startup instead of on a later network error.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).expect("capture 0 always present");
		let var_name = cap.get(1).expect("group 1 always present").as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value.as_str());
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment placeholders
	/// and `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid config path: {}", path)))?;
		loader.load_config(Path::new(file_name)).await
	}

	/// Validates the loaded configuration.
	///
	/// Credential checks run here so that an unusable deployment fails at
	/// startup, never on the first payment.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let required = |name: &str, empty: bool| {
			if empty {
				Err(ConfigError::Validation(format!(
					"Missing required configuration value: {}",
					name
				)))
			} else {
				Ok(())
			}
		};

		required("settler.id", self.settler.id.trim().is_empty())?;
		required("settler.base_url", self.settler.base_url.trim().is_empty())?;
		required("mpesa.consumer_key", self.mpesa.consumer_key.is_empty())?;
		required(
			"mpesa.consumer_secret",
			self.mpesa.consumer_secret.is_empty(),
		)?;
		required("mpesa.shortcode", self.mpesa.shortcode.trim().is_empty())?;
		required("mpesa.passkey", self.mpesa.passkey.is_empty())?;

		if !self.settler.base_url.starts_with("http") {
			return Err(ConfigError::Validation(
				"settler.base_url must be an http(s) URL".to_string(),
			));
		}

		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"storage.primary '{}' has no matching entry under storage.implementations",
				self.storage.primary
			)));
		}

		if !self
			.notifier
			.implementations
			.contains_key(&self.notifier.primary)
		{
			return Err(ConfigError::Validation(format!(
				"notifier.primary '{}' has no matching entry under notifier.implementations",
				self.notifier.primary
			)));
		}

		if self.mpesa.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"mpesa.max_attempts must be at least 1".to_string(),
			));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base_config(mpesa_extra: &str) -> String {
		format!(
			r#"
[settler]
id = "test-settler"
base_url = "https://shop.example.com"

[mpesa]
consumer_key = "key"
consumer_secret = "secret"
shortcode = "174379"
passkey = "passkey"
{mpesa_extra}

[storage]
primary = "memory"
[storage.implementations.memory]

[notifier]
primary = "log"
[notifier.implementations.log]
"#
		)
	}

	#[test]
	fn test_parse_minimal_config() {
		let config: Config = base_config("").parse().unwrap();
		assert_eq!(config.settler.id, "test-settler");
		assert_eq!(config.mpesa.api_url, "https://sandbox.safaricom.co.ke");
		assert_eq!(config.mpesa.token_timeout_secs, 5);
		assert_eq!(config.mpesa.max_attempts, 3);
		assert!(config.card.is_none());
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("SETTLER_TEST_SHORTCODE", "600999");
		let content = base_config("").replace("174379", "${SETTLER_TEST_SHORTCODE}");
		let config: Config = content.parse().unwrap();
		assert_eq!(config.mpesa.shortcode, "600999");
		std::env::remove_var("SETTLER_TEST_SHORTCODE");
	}

	#[test]
	fn test_env_var_default_value() {
		let resolved = resolve_env_vars("url = \"${SETTLER_TEST_UNSET:-http://fallback}\"").unwrap();
		assert_eq!(resolved, "url = \"http://fallback\"");
	}

	#[test]
	fn test_missing_env_var_fails_load() {
		let content = base_config("").replace("\"key\"", "\"${SETTLER_TEST_MISSING_KEY}\"");
		let result: Result<Config, _> = content.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_empty_credential_rejected() {
		let content = base_config("").replace("consumer_secret = \"secret\"", "consumer_secret = \"\"");
		let result: Result<Config, _> = content.parse();
		let message = result.unwrap_err().to_string();
		assert!(message.contains("mpesa.consumer_secret"));
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let content = base_config("").replace("primary = \"memory\"", "primary = \"redis\"");
		let result: Result<Config, _> = content.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_timeout_overrides() {
		let config: Config =
			base_config("token_timeout_secs = 2\ninitiation_timeout_secs = 20").parse().unwrap();
		assert_eq!(config.mpesa.token_timeout_secs, 2);
		assert_eq!(config.mpesa.initiation_timeout_secs, 20);
	}
}
