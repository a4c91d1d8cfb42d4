//! Configuration validation schemas.
//!
//! A small framework for validating the TOML sections handed to pluggable
//! implementations before they are constructed, so misconfiguration fails
//! at startup with a field-level message instead of at first use.

use thiserror::Error;

/// Errors produced by configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field is present but holds an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong TOML type.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// A string value; empty strings are rejected when `non_empty` is set.
	String { non_empty: bool },
	/// An integer value with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A boolean value.
	Boolean,
}

/// A named field in a schema.
#[derive(Debug)]
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
}

impl Field {
	/// Creates a field with the given name and expected type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
		}
	}
}

/// Validation schema for one implementation's TOML section.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a schema from required and optional field lists.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			check_field(&field.name, value, &field.field_type)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				check_field(&field.name, value, &field.field_type)?;
			}
		}

		Ok(())
	}
}

fn check_field(
	name: &str,
	value: &toml::Value,
	expected: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	};

	match expected {
		FieldType::String { non_empty } => {
			let s = value.as_str().ok_or_else(|| mismatch("string"))?;
			if *non_empty && s.trim().is_empty() {
				return Err(ValidationError::InvalidValue {
					field: name.to_string(),
					message: "must not be empty".to_string(),
				});
			}
		},
		FieldType::Integer { min, max } => {
			let n = value.as_integer().ok_or_else(|| mismatch("integer"))?;
			if let Some(min) = min {
				if n < *min {
					return Err(ValidationError::InvalidValue {
						field: name.to_string(),
						message: format!("value {} is less than minimum {}", n, min),
					});
				}
			}
			if let Some(max) = max {
				if n > *max {
					return Err(ValidationError::InvalidValue {
						field: name.to_string(),
						message: format!("value {} is greater than maximum {}", n, max),
					});
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch("boolean"));
			}
		},
	}

	Ok(())
}

/// Trait implemented by each pluggable implementation's schema, used to
/// validate its TOML section before the factory runs.
pub trait ConfigSchema: Send + Sync {
	/// Validates a TOML configuration value against this schema.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("url", FieldType::String { non_empty: true })],
			vec![Field::new(
				"timeout_secs",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		)
	}

	#[test]
	fn test_valid_section_passes() {
		let value: toml::Value = toml::from_str("url = \"http://x\"\ntimeout_secs = 10").unwrap();
		assert!(schema().validate(&value).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let value: toml::Value = toml::from_str("timeout_secs = 10").unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "url"));
	}

	#[test]
	fn test_empty_string_rejected() {
		let value: toml::Value = toml::from_str("url = \"  \"").unwrap();
		assert!(matches!(
			schema().validate(&value),
			Err(ValidationError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_integer_bounds() {
		let value: toml::Value = toml::from_str("url = \"http://x\"\ntimeout_secs = 0").unwrap();
		assert!(matches!(
			schema().validate(&value),
			Err(ValidationError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_type_mismatch() {
		let value: toml::Value = toml::from_str("url = 5").unwrap();
		assert!(matches!(
			schema().validate(&value),
			Err(ValidationError::TypeMismatch { .. })
		));
	}
}
