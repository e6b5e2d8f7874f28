//! Schema checks for the TOML tables that configure signers and verifiers.
//!
//! Each pluggable implementation publishes a [`Schema`] describing the keys
//! it reads. Factories and the toolkit builder both run it, so a typo in a key
//! or a malformed address fails at startup, not at signing time.

use crate::utils::u256_serde::parse_u256;
use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Expected shape of a configuration value.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// A string holding a 20-byte hex address.
	Address,
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Boolean,
	/// A non-negative integer or a decimal/hex string that fits in 256 bits.
	Uint256,
	Array(Box<FieldType>),
	Table(Schema),
}

pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches an extra check that runs after the type check passes.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of one TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates `config`, recursing into nested tables. Unknown keys are ignored.
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
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch(field_name, "string", value));
			}
		},
		FieldType::Address => {
			let text = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "address string", value))?;
			text.parse::<Address>()
				.map_err(|e| ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("'{}' is not an address: {}", text, e),
				})?;
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}
			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch(field_name, "boolean", value));
			}
		},
		FieldType::Uint256 => match value {
			toml::Value::Integer(i) if *i >= 0 => {},
			toml::Value::Integer(i) => {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("Value {} is negative", i),
				});
			},
			toml::Value::String(text) => {
				parse_u256(text).map_err(|message| ValidationError::InvalidValue {
					field: field_name.to_string(),
					message,
				})?;
			},
			other => return Err(mismatch(field_name, "uint256", other)),
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| match e {
				ValidationError::MissingField(f) => {
					ValidationError::MissingField(format!("{}.{}", field_name, f))
				},
				ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
					field: format!("{}.{}", field_name, field),
					message,
				},
				ValidationError::TypeMismatch {
					field,
					expected,
					actual,
				} => ValidationError::TypeMismatch {
					field: format!("{}.{}", field_name, field),
					expected,
					actual,
				},
			})?;
		},
	}

	Ok(())
}

/// Implemented by every pluggable signer and verifier to check its own table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(url) if url.starts_with("http") => Ok(()),
						_ => Err("must be an http(s) url".to_string()),
					}
				}),
				Field::new("market", FieldType::Address),
			],
			vec![
				Field::new("poll_seconds", FieldType::Integer {
					min: Some(1),
					max: Some(60),
				}),
				Field::new(
					"token",
					FieldType::Table(Schema::new(
						vec![Field::new("name", FieldType::String)],
						vec![],
					)),
				),
			],
		)
	}

	fn parse(input: &str) -> toml::Value {
		toml::from_str(input).unwrap()
	}

	#[test]
	fn test_valid_table() {
		let config = parse(
			r#"
			rpc_url = "http://localhost:8545"
			market = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
			poll_seconds = 2
			[token]
			name = "HTToken"
			"#,
		);
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required() {
		let config = parse(r#"rpc_url = "http://localhost:8545""#);
		assert_eq!(
			schema().validate(&config),
			Err(ValidationError::MissingField("market".to_string()))
		);
	}

	#[test]
	fn test_bad_address() {
		let config = parse(
			r#"
			rpc_url = "http://localhost:8545"
			market = "0x1234"
			"#,
		);
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "market"
		));
	}

	#[test]
	fn test_array_items_are_checked() {
		let schema = Schema::new(
			vec![],
			vec![Field::new("whitelist", FieldType::Array(Box::new(FieldType::Address)))],
		);
		let ok = parse(r#"whitelist = ["0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"]"#);
		assert!(schema.validate(&ok).is_ok());

		let bad = parse(r#"whitelist = ["0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0", "bob"]"#);
		assert!(matches!(
			schema.validate(&bad),
			Err(ValidationError::InvalidValue { field, .. }) if field == "whitelist[1]"
		));
	}

	#[test]
	fn test_uint256_accepts_integers_and_strings() {
		let schema = Schema::new(vec![Field::new("price", FieldType::Uint256)], vec![]);
		assert!(schema.validate(&parse("price = 5")).is_ok());
		assert!(schema.validate(&parse(r#"price = "1000000000000000000000""#)).is_ok());
		assert!(schema.validate(&parse(r#"price = "0xff""#)).is_ok());
		assert!(schema.validate(&parse("price = -1")).is_err());
		assert!(schema.validate(&parse(r#"price = "one""#)).is_err());
		assert!(schema.validate(&parse("price = 1.5")).is_err());
	}

	#[test]
	fn test_bounds_and_custom_validator() {
		let config = parse(
			r#"
			rpc_url = "http://localhost:8545"
			market = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
			poll_seconds = 0
			"#,
		);
		assert!(schema().validate(&config).is_err());

		let config = parse(
			r#"
			rpc_url = "ws://localhost:8545"
			market = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
			"#,
		);
		assert!(schema().validate(&config).is_err());
	}

	#[test]
	fn test_nested_errors_are_prefixed() {
		let config = parse(
			r#"
			rpc_url = "http://localhost:8545"
			market = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
			[token]
			name = 7
			"#,
		);
		assert_eq!(
			schema().validate(&config),
			Err(ValidationError::TypeMismatch {
				field: "token.name".to_string(),
				expected: "string".to_string(),
				actual: "integer".to_string(),
			})
		);
	}
}
