//! Field validation and error aggregation
//!
//! Structural checks (required presence, numeric sanity, checkbox coercion)
//! run first, then every declared custom validator for fields present in the
//! payload. All failures are collected; nothing short-circuits, so the client
//! sees every problem in one round trip.

use crate::registry::ModelDefinition;
use crate::schema::ModelSchema;
use crate::types::{DataType, FieldDescriptor, FieldError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Failure raised by a single field validator.
#[derive(Debug, Clone)]
pub struct FieldValidationError {
	pub message: String,
}

impl FieldValidationError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// A named per-field validator. Validators normalize as they check: the
/// returned value is what gets persisted.
pub trait FieldValidator: Send + Sync {
	fn validate(
		&self,
		raw: &Value,
		existing_id: Option<&str>,
	) -> Result<Value, FieldValidationError>;
}

/// Whether the payload is creating a row or updating an existing one.
/// Updates only validate the fields they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
	Create,
	Update,
}

/// Outcome of validating one payload: the normalized write set plus every
/// collected failure. The write set is only meaningful when `errors` is
/// empty.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
	pub values: serde_json::Map<String, Value>,
	pub errors: Vec<FieldError>,
}

fn is_missing(value: Option<&Value>) -> bool {
	match value {
		None | Some(Value::Null) => true,
		Some(Value::String(s)) => s.trim().is_empty(),
		Some(_) => false,
	}
}

fn field_required(field: &FieldDescriptor) -> bool {
	!field.is_nullable && !field.is_primary_key && field.column_default.is_none()
}

fn coerce_checkbox(value: Option<&Value>) -> Value {
	match value {
		Some(Value::Bool(b)) => Value::Bool(*b),
		Some(Value::String(s)) => {
			Value::Bool(matches!(s.as_str(), "on" | "true" | "1"))
		}
		Some(Value::Number(n)) => Value::Bool(n.as_i64() == Some(1)),
		_ => Value::Bool(false),
	}
}

fn coerce_number(value: &Value) -> Result<Value, FieldValidationError> {
	match value {
		Value::Number(n) => {
			if n.as_f64().is_some_and(f64::is_nan) {
				Err(FieldValidationError::new("Invalid number"))
			} else {
				Ok(value.clone())
			}
		}
		Value::String(s) => {
			let trimmed = s.trim();
			if let Ok(i) = trimmed.parse::<i64>() {
				Ok(Value::from(i))
			} else if let Ok(f) = trimmed.parse::<f64>() {
				if f.is_nan() {
					Err(FieldValidationError::new("Invalid number"))
				} else {
					Ok(Value::from(f))
				}
			} else {
				Err(FieldValidationError::new("Invalid number"))
			}
		}
		_ => Err(FieldValidationError::new("Invalid number")),
	}
}

/// Validate one payload against the model's schema and declared validators.
///
/// Excluded, readonly and primary-key fields never enter the write set. On
/// create, every required field must be present; on update only the supplied
/// fields are checked.
pub fn validate_payload(
	definition: &ModelDefinition,
	schema: &ModelSchema,
	payload: &serde_json::Map<String, Value>,
	mode: WriteMode,
	existing_id: Option<&str>,
) -> ValidationOutcome {
	let mut outcome = ValidationOutcome::default();

	for field in &schema.fields {
		let name = &field.column_name;
		if field.is_primary_key
			|| definition.exclude_fields.iter().any(|f| f == name)
			|| definition.readonly_fields.iter().any(|f| f == name)
		{
			continue;
		}
		let supplied = payload.get(name);

		if field.data_type == DataType::Boolean {
			// Checkboxes submit nothing when unchecked; absence is false on
			// create but leaves the stored value alone on update.
			if mode == WriteMode::Update && supplied.is_none() {
				continue;
			}
			outcome
				.values
				.insert(name.clone(), coerce_checkbox(supplied));
			continue;
		}

		if is_missing(supplied) {
			if supplied.is_none() {
				if mode == WriteMode::Create && field_required(field) {
					outcome
						.errors
						.push(FieldError::new(name.clone(), "This field is required"));
				}
			} else if field.is_nullable {
				// Explicit empty on a nullable column clears it.
				outcome.values.insert(name.clone(), Value::Null);
			} else if field.column_default.is_none() {
				// Explicit empty on a required column is a failure in both
				// modes; with a default it means "use the default".
				outcome
					.errors
					.push(FieldError::new(name.clone(), "This field is required"));
			}
			continue;
		}
		let raw = match supplied {
			Some(v) => v.clone(),
			None => continue,
		};

		let structural = if field.data_type == DataType::Integer {
			match coerce_number(&raw) {
				Ok(v) => v,
				Err(e) => {
					outcome.errors.push(FieldError::new(name.clone(), e.message));
					continue;
				}
			}
		} else {
			raw
		};

		match definition.validators.get(name) {
			Some(validator) => match validator.validate(&structural, existing_id) {
				Ok(normalized) => {
					outcome.values.insert(name.clone(), normalized);
				}
				Err(e) => {
					outcome.errors.push(FieldError::new(name.clone(), e.message));
				}
			},
			None => {
				outcome.values.insert(name.clone(), structural);
			}
		}
	}

	outcome
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
});
static SLUG_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap_or_else(|e| panic!("slug regex: {e}")));
static COLOR_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap_or_else(|e| panic!("color regex: {e}"))
});

/// Trims, lowercases and checks the address shape.
pub struct EmailValidator;

impl FieldValidator for EmailValidator {
	fn validate(&self, raw: &Value, _existing_id: Option<&str>) -> Result<Value, FieldValidationError> {
		let text = raw
			.as_str()
			.ok_or_else(|| FieldValidationError::new("Invalid email format"))?;
		let normalized = text.trim().to_lowercase();
		if EMAIL_RE.is_match(&normalized) {
			Ok(Value::from(normalized))
		} else {
			Err(FieldValidationError::new("Invalid email format"))
		}
	}
}

/// Lowercase letters, digits and hyphens only.
pub struct SlugValidator;

impl FieldValidator for SlugValidator {
	fn validate(&self, raw: &Value, _existing_id: Option<&str>) -> Result<Value, FieldValidationError> {
		let text = raw
			.as_str()
			.map(str::trim)
			.ok_or_else(|| FieldValidationError::new("Invalid slug"))?;
		if SLUG_RE.is_match(text) {
			Ok(Value::from(text))
		} else {
			Err(FieldValidationError::new(
				"Invalid slug: use lowercase letters, numbers and hyphens",
			))
		}
	}
}

/// Hex color of the form `#RRGGBB`, normalized to uppercase.
pub struct ColorValidator;

impl FieldValidator for ColorValidator {
	fn validate(&self, raw: &Value, _existing_id: Option<&str>) -> Result<Value, FieldValidationError> {
		let text = raw
			.as_str()
			.map(str::trim)
			.ok_or_else(|| FieldValidationError::new("Invalid color"))?;
		if COLOR_RE.is_match(text) {
			Ok(Value::from(text.to_uppercase()))
		} else {
			Err(FieldValidationError::new("Invalid color: expected #RRGGBB"))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::registry::ModelDefinition;
	use crate::schema::{ColumnMeta, NativeType, SchemaCatalog, TableSchema};
	use rstest::rstest;
	use std::sync::Arc;

	fn user_schema() -> ModelSchema {
		SchemaCatalog::builder()
			.table(
				TableSchema::new("users", "id")
					.column(ColumnMeta::new("id", NativeType::Integer))
					.column(ColumnMeta::new("email", NativeType::VarChar(255)))
					.column(ColumnMeta::new("last_name", NativeType::VarChar(100)))
					.column(ColumnMeta::new("age", NativeType::Integer).nullable())
					.column(ColumnMeta::new("is_active", NativeType::Boolean)),
			)
			.build()
			.describe("users")
			.unwrap()
	}

	fn user_definition() -> ModelDefinition {
		ModelDefinition::builder("users", "Users")
			.validator("email", Arc::new(EmailValidator))
			.build()
	}

	#[test]
	fn test_all_errors_collected_not_just_first() {
		let payload = serde_json::json!({"email": "BAD"})
			.as_object()
			.cloned()
			.unwrap_or_default();
		let outcome = validate_payload(
			&user_definition(),
			&user_schema(),
			&payload,
			WriteMode::Create,
			None,
		);
		assert_eq!(outcome.errors.len(), 2);
		let fields: Vec<&str> = outcome.errors.iter().map(|e| e.field.as_str()).collect();
		assert!(fields.contains(&"email"));
		assert!(fields.contains(&"last_name"));
	}

	#[test]
	fn test_email_normalized_to_trimmed_lowercase() {
		let payload = serde_json::json!({"email": " Foo@Bar.com ", "last_name": "Doe"})
			.as_object()
			.cloned()
			.unwrap_or_default();
		let outcome = validate_payload(
			&user_definition(),
			&user_schema(),
			&payload,
			WriteMode::Create,
			None,
		);
		assert!(outcome.errors.is_empty());
		assert_eq!(outcome.values["email"], "foo@bar.com");
	}

	#[test]
	fn test_update_skips_absent_fields() {
		let payload = serde_json::json!({"age": "41"})
			.as_object()
			.cloned()
			.unwrap_or_default();
		let outcome = validate_payload(
			&user_definition(),
			&user_schema(),
			&payload,
			WriteMode::Update,
			Some("1"),
		);
		assert!(outcome.errors.is_empty());
		assert_eq!(outcome.values["age"], 41);
		assert!(!outcome.values.contains_key("email"));
		// absent checkbox must not be forced to false on update
		assert!(!outcome.values.contains_key("is_active"));
	}

	#[test]
	fn test_non_numeric_integer_rejected() {
		let payload = serde_json::json!({"age": "plenty"})
			.as_object()
			.cloned()
			.unwrap_or_default();
		let outcome = validate_payload(
			&user_definition(),
			&user_schema(),
			&payload,
			WriteMode::Update,
			Some("1"),
		);
		assert_eq!(outcome.errors.len(), 1);
		assert_eq!(outcome.errors[0].field, "age");
	}

	#[test]
	fn test_checkbox_absent_is_false_on_create() {
		let payload = serde_json::json!({"email": "a@b.co", "last_name": "Doe"})
			.as_object()
			.cloned()
			.unwrap_or_default();
		let outcome = validate_payload(
			&user_definition(),
			&user_schema(),
			&payload,
			WriteMode::Create,
			None,
		);
		assert_eq!(outcome.values["is_active"], false);
	}

	#[rstest]
	#[case("summer-2024", true)]
	#[case("Summer", false)]
	#[case("a_b", false)]
	fn test_slug_validator(#[case] input: &str, #[case] ok: bool) {
		let result = SlugValidator.validate(&Value::from(input), None);
		assert_eq!(result.is_ok(), ok);
	}

	#[rstest]
	#[case("#A1B2C3", Some("#A1B2C3"))]
	#[case("#a1b2c3", Some("#A1B2C3"))]
	#[case("red", None)]
	#[case("#12345", None)]
	fn test_color_validator(#[case] input: &str, #[case] expected: Option<&str>) {
		let result = ColorValidator.validate(&Value::from(input), None);
		match expected {
			Some(v) => assert_eq!(result.ok(), Some(Value::from(v))),
			None => assert!(result.is_err()),
		}
	}
}
