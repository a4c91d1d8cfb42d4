//! Secure string type for credentials.
//!
//! `SecretString` wraps sensitive values (consumer secrets, passkeys, SMTP
//! passwords) so they are zeroed on drop and redacted in logs, debug output,
//! and serialized configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// A string whose memory is wiped on drop and whose value never appears in
/// `Debug`, `Display`, or serialized output.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	/// Wraps a string as a secret.
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the underlying value.
	///
	/// Call sites must not log or store the exposed value.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// True when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString(***)")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "***")
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

// Serialization always redacts; secrets enter the process through
// environment resolution at config load, never leave through it.
impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str("***")
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Ok(SecretString::new(s))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_debug_and_display_redact() {
		let secret = SecretString::from("consumer-secret");
		assert_eq!(format!("{:?}", secret), "SecretString(***)");
		assert_eq!(format!("{}", secret), "***");
	}

	#[test]
	fn test_expose_returns_value() {
		let secret = SecretString::from("passkey-value");
		assert_eq!(secret.expose(), "passkey-value");
		assert!(!secret.is_empty());
		assert!(SecretString::from("").is_empty());
	}

	#[test]
	fn test_serialize_redacts() {
		let secret = SecretString::from("super-secret");
		let json = serde_json::to_string(&secret).unwrap();
		assert!(!json.contains("super-secret"));
	}

	#[test]
	fn test_deserialize_keeps_value() {
		let secret: SecretString = serde_json::from_str("\"abc\"").unwrap();
		assert_eq!(secret.expose(), "abc");
	}
}
