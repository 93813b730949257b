//! Shared types for the admin engine
//!
//! Wire-facing structures serialize in camelCase because the admin UI
//! consumes them directly.

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use simpleblog_db::DbError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors surfaced by admin operations.
///
/// Validation failures are NOT represented here: invalid input is a normal
/// outcome and travels inside [`PostResult::Error`]. This enum covers
/// configuration mistakes, missing rows and infrastructure failures, which
/// propagate with `?` to the HTTP layer for status mapping.
#[derive(Debug, Error)]
pub enum AdminError {
	#[error("unknown model: {0}")]
	UnknownModel(String),

	#[error("no schema registered for storage model: {0}")]
	SchemaNotFound(String),

	#[error("unknown action '{action}' for model '{model}'")]
	UnknownAction { model: String, action: String },

	#[error("item '{id}' not found in model '{model}'")]
	ItemNotFound { model: String, id: String },

	#[error("no '{model}' row with {field} = '{value}'")]
	NotFound {
		model: String,
		field: String,
		value: String,
	},

	#[error("invalid definition for model '{model}': {message}")]
	InvalidDefinition { model: String, message: String },

	#[error("failed to build query: {0}")]
	QueryBuild(String),

	#[error("database error: {0}")]
	Database(#[from] DbError),
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Normalized column type, derived from the native schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
	Text,
	VarChar,
	Integer,
	Boolean,
	Date,
	DateTime,
	Timestamp,
	Json,
	Array,
	Enum,
	Uuid,
}

impl DataType {
	/// Date-like columns take `__$gte`/`__$lte` range filters.
	pub fn is_date_like(self) -> bool {
		matches!(self, DataType::Date | DataType::DateTime | DataType::Timestamp)
	}

	pub fn is_text_like(self) -> bool {
		matches!(self, DataType::Text | DataType::VarChar)
	}
}

/// Normalized metadata for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
	pub column_name: String,
	pub data_type: DataType,
	pub is_nullable: bool,
	pub is_primary_key: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub column_default: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub enum_values: Option<Vec<String>>,
}

/// A many-to-one or one-to-one edge from a column to another model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDescriptor {
	pub from_field: String,
	pub to_model: String,
	pub to_field: String,
	/// When true the target set is small enough to send as a fixed choice
	/// list; otherwise the UI goes through autocomplete.
	pub is_prefetch_choice: bool,
}

/// One selectable value for a bounded-choice field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
	pub value: serde_json::Value,
	pub label: String,
}

/// Bulk action metadata. Confirmation flags are advisory only, enforced by
/// the UI before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDef {
	pub key: String,
	pub label: String,
	pub requires_confirmation: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confirmation_message: Option<String>,
}

/// Result of a list query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
	pub items: Vec<serde_json::Map<String, serde_json::Value>>,
	pub total: u64,
	pub items_count: u64,
	pub list_display_fields: Vec<String>,
	pub search_fields: Vec<String>,
	pub actions: Vec<ActionDef>,
	pub can_add_item: bool,
	pub list_filter_fields: Vec<String>,
	pub fields_and_types: Vec<FieldDescriptor>,
}

/// Inline child ids attached to a retrieved parent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineItems {
	pub items: Vec<serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exclude: Option<Vec<String>>,
}

/// Presentation metadata for one inline section, sent alongside item
/// metadata so the UI can render child forms without a second round trip.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineMeta {
	pub model_key: String,
	pub label: String,
	pub default_expanded: bool,
	/// Field subset shown in the inline form; empty means all fields.
	pub fields: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_items: Option<u32>,
	pub can_add: bool,
	pub can_delete: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub layout: Option<String>,
	pub foreign_key_field: String,
}

/// Result of item retrieval and of create-form metadata assembly.
///
/// Built fresh for every call; underlying rows may change between requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
	pub item: Option<serde_json::Map<String, serde_json::Value>>,
	pub fields_and_types: Vec<FieldDescriptor>,
	pub filter_types: BTreeMap<String, Vec<Choice>>,
	pub relations: Vec<RelationDescriptor>,
	pub readonly_fields: Vec<String>,
	pub field_labels: BTreeMap<String, String>,
	pub field_widgets: BTreeMap<String, String>,
	pub inlines: Vec<InlineMeta>,
	pub inline_items: BTreeMap<String, InlineItems>,
}

/// One field-level failure. `item` identifies the failing child row (its id,
/// or the submitted index for not-yet-created items) in inline saves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	pub field: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub item: Option<String>,
}

impl FieldError {
	pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			message: message.into(),
			item: None,
		}
	}

	pub fn for_item(
		field: impl Into<String>,
		message: impl Into<String>,
		item: impl Into<String>,
	) -> Self {
		Self {
			field: field.into(),
			message: message.into(),
			item: Some(item.into()),
		}
	}
}

/// Error payload shape: flat field errors for a single object, or a map
/// keyed by child model for inline saves. Exactly one shape per failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
	Fields(Vec<FieldError>),
	Nested(BTreeMap<String, Vec<FieldError>>),
	None,
}

/// Uniform envelope returned by every mutating operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PostResult {
	Success {
		message: String,
		data: serde_json::Value,
	},
	Error {
		message: String,
		detail: ErrorDetail,
	},
}

impl PostResult {
	pub fn success(message: impl Into<String>, data: serde_json::Value) -> Self {
		PostResult::Success {
			message: message.into(),
			data,
		}
	}

	pub fn field_errors(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
		PostResult::Error {
			message: message.into(),
			detail: ErrorDetail::Fields(errors),
		}
	}

	pub fn nested_errors(
		message: impl Into<String>,
		error_map: BTreeMap<String, Vec<FieldError>>,
	) -> Self {
		PostResult::Error {
			message: message.into(),
			detail: ErrorDetail::Nested(error_map),
		}
	}

	pub fn error_message(message: impl Into<String>) -> Self {
		PostResult::Error {
			message: message.into(),
			detail: ErrorDetail::None,
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, PostResult::Success { .. })
	}
}

// The wire shape keeps both `errors` and `errorMap` as nullable keys; the
// enum guarantees at most one carries data.
impl Serialize for PostResult {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("PostResult", 5)?;
		match self {
			PostResult::Success { message, data } => {
				state.serialize_field("status", "success")?;
				state.serialize_field("message", message)?;
				state.serialize_field("errors", &serde_json::Value::Null)?;
				state.serialize_field("errorMap", &serde_json::Value::Null)?;
				state.serialize_field("data", data)?;
			}
			PostResult::Error { message, detail } => {
				state.serialize_field("status", "error")?;
				state.serialize_field("message", message)?;
				match detail {
					ErrorDetail::Fields(errors) => {
						state.serialize_field("errors", errors)?;
						state.serialize_field("errorMap", &serde_json::Value::Null)?;
					}
					ErrorDetail::Nested(map) => {
						state.serialize_field("errors", &serde_json::Value::Null)?;
						state.serialize_field("errorMap", map)?;
					}
					ErrorDetail::None => {
						state.serialize_field("errors", &serde_json::Value::Null)?;
						state.serialize_field("errorMap", &serde_json::Value::Null)?;
					}
				}
				state.serialize_field("data", &serde_json::Value::Null)?;
			}
		}
		state.end()
	}
}

/// An existing child row update inside an inline save.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingFormData {
	pub id: serde_json::Value,
	pub form_data: serde_json::Map<String, serde_json::Value>,
}

/// A new child row inside an inline save, identified by a client-assigned
/// index until a server id exists.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFormData {
	pub idx: u64,
	pub form_data: serde_json::Map<String, serde_json::Value>,
}

/// Request-scoped batch for "save parent's dependent children in one go".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineSaveBatch {
	#[serde(default)]
	pub existing_items: BTreeMap<String, Vec<ExistingFormData>>,
	#[serde(default)]
	pub new_items: BTreeMap<String, Vec<NewFormData>>,
}

/// Target rows for a bulk action: explicit ids, or everything matching the
/// caller's current filter context (resupplied per call, never retained).
#[derive(Debug, Clone)]
pub enum IdSelector {
	Ids(Vec<String>),
	All {
		filters: BTreeMap<String, serde_json::Value>,
		search_term: Option<String>,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_success_wire_shape() {
		let result = PostResult::success("Saved", serde_json::json!({"$pk": 3}));
		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["status"], "success");
		assert_eq!(json["message"], "Saved");
		assert!(json["errors"].is_null());
		assert!(json["errorMap"].is_null());
		assert_eq!(json["data"]["$pk"], 3);
	}

	#[test]
	fn test_field_errors_wire_shape() {
		let result = PostResult::field_errors(
			"Validation failed",
			vec![FieldError::new("email", "Invalid email format")],
		);
		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["status"], "error");
		assert_eq!(json["errors"][0]["field"], "email");
		assert!(json["errorMap"].is_null());
		assert!(json["data"].is_null());
		// `item` is omitted when absent
		assert!(json["errors"][0].get("item").is_none());
	}

	#[test]
	fn test_nested_errors_wire_shape() {
		let mut map = BTreeMap::new();
		map.insert(
			"pollOption".to_string(),
			vec![FieldError::for_item("text", "This field is required", "7")],
		);
		let result = PostResult::nested_errors("Some items failed", map);
		let json = serde_json::to_value(&result).unwrap();
		assert!(json["errors"].is_null());
		assert_eq!(json["errorMap"]["pollOption"][0]["item"], "7");
	}

	#[test]
	fn test_inline_batch_deserializes_camel_case() {
		let raw = serde_json::json!({
			"existingItems": {
				"pollQuestion": [{"id": 5, "formData": {"text": "Q?"}}]
			},
			"newItems": {
				"pollQuestion": [{"idx": 0, "formData": {"text": "New"}}]
			}
		});
		let batch: InlineSaveBatch = serde_json::from_value(raw).unwrap();
		assert_eq!(batch.existing_items["pollQuestion"].len(), 1);
		assert_eq!(batch.new_items["pollQuestion"][0].idx, 0);
	}
}
