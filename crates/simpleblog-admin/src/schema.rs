//! Schema catalog
//!
//! A process-lifetime catalog of table metadata, declared at startup and
//! immutable afterwards. The engine never inspects the live database; it
//! reads normalized descriptors from here.

use crate::types::{AdminError, AdminResult, DataType, FieldDescriptor, RelationDescriptor};
use std::collections::BTreeMap;

/// Native column type as the storage layer declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeType {
	VarChar(u32),
	Text,
	Integer,
	BigInt,
	Boolean,
	Date,
	DateTime,
	TimestampTz,
	Json,
	/// Element type name, e.g. `text`.
	Array(String),
	/// Named enum with its declared variants.
	Enum(String, Vec<String>),
	Uuid,
}

impl NativeType {
	/// Lossy, deterministic normalization into the closed admin type set.
	/// Every timestamp-like native type collapses to `DateTime`.
	pub fn normalize(&self) -> DataType {
		match self {
			NativeType::VarChar(_) => DataType::VarChar,
			NativeType::Text => DataType::Text,
			NativeType::Integer | NativeType::BigInt => DataType::Integer,
			NativeType::Boolean => DataType::Boolean,
			NativeType::Date => DataType::Date,
			NativeType::DateTime | NativeType::TimestampTz => DataType::DateTime,
			NativeType::Json => DataType::Json,
			NativeType::Array(_) => DataType::Array,
			NativeType::Enum(_, _) => DataType::Enum,
			NativeType::Uuid => DataType::Uuid,
		}
	}
}

/// One column declaration.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
	pub name: String,
	pub native_type: NativeType,
	pub nullable: bool,
	/// Default expression as the storage layer spells it, e.g. `now()`,
	/// `'draft'::post_status`, `ARRAY['a','b']`.
	pub default: Option<String>,
}

impl ColumnMeta {
	pub fn new(name: impl Into<String>, native_type: NativeType) -> Self {
		Self {
			name: name.into(),
			native_type,
			nullable: false,
			default: None,
		}
	}

	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
		self.default = Some(expr.into());
		self
	}
}

/// One relation declaration on a table.
#[derive(Debug, Clone)]
pub struct RelationMeta {
	pub from_field: String,
	pub to_model: String,
	pub to_field: String,
	pub is_prefetch_choice: bool,
}

/// Full declaration for one table.
#[derive(Debug, Clone)]
pub struct TableSchema {
	pub table: String,
	pub primary_key: String,
	pub columns: Vec<ColumnMeta>,
	pub relations: Vec<RelationMeta>,
}

impl TableSchema {
	pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			primary_key: primary_key.into(),
			columns: Vec::new(),
			relations: Vec::new(),
		}
	}

	pub fn column(mut self, column: ColumnMeta) -> Self {
		self.columns.push(column);
		self
	}

	pub fn relation(
		mut self,
		from_field: impl Into<String>,
		to_model: impl Into<String>,
		to_field: impl Into<String>,
		is_prefetch_choice: bool,
	) -> Self {
		self.relations.push(RelationMeta {
			from_field: from_field.into(),
			to_model: to_model.into(),
			to_field: to_field.into(),
			is_prefetch_choice,
		});
		self
	}
}

/// Normalized view of one storage model, handed to the engine.
#[derive(Debug, Clone)]
pub struct ModelSchema {
	pub fields: Vec<FieldDescriptor>,
	pub relations: Vec<RelationDescriptor>,
	pub primary_key_field: String,
}

/// Immutable catalog of declared tables. Built once, shared via `Arc`.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
	tables: BTreeMap<String, TableSchema>,
}

impl SchemaCatalog {
	pub fn builder() -> SchemaCatalogBuilder {
		SchemaCatalogBuilder {
			tables: BTreeMap::new(),
		}
	}

	pub fn contains(&self, storage_model: &str) -> bool {
		self.tables.contains_key(storage_model)
	}

	/// Raw table declaration, for callers that need native detail.
	pub fn table(&self, storage_model: &str) -> AdminResult<&TableSchema> {
		self.tables
			.get(storage_model)
			.ok_or_else(|| AdminError::SchemaNotFound(storage_model.to_string()))
	}

	/// Normalized descriptors for one storage model.
	pub fn describe(&self, storage_model: &str) -> AdminResult<ModelSchema> {
		let table = self.table(storage_model)?;
		let fields = table
			.columns
			.iter()
			.map(|col| {
				let enum_values = match &col.native_type {
					NativeType::Enum(_, variants) => Some(variants.clone()),
					_ => None,
				};
				FieldDescriptor {
					column_name: col.name.clone(),
					data_type: col.native_type.normalize(),
					is_nullable: col.nullable,
					is_primary_key: col.name == table.primary_key,
					column_default: col.default.clone(),
					enum_values,
				}
			})
			.collect();
		let relations = table
			.relations
			.iter()
			.map(|rel| RelationDescriptor {
				from_field: rel.from_field.clone(),
				to_model: rel.to_model.clone(),
				to_field: rel.to_field.clone(),
				is_prefetch_choice: rel.is_prefetch_choice,
			})
			.collect();
		Ok(ModelSchema {
			fields,
			relations,
			primary_key_field: table.primary_key.clone(),
		})
	}
}

pub struct SchemaCatalogBuilder {
	tables: BTreeMap<String, TableSchema>,
}

impl SchemaCatalogBuilder {
	pub fn table(mut self, schema: TableSchema) -> Self {
		self.tables.insert(schema.table.clone(), schema);
		self
	}

	pub fn build(self) -> SchemaCatalog {
		SchemaCatalog {
			tables: self.tables,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_catalog() -> SchemaCatalog {
		SchemaCatalog::builder()
			.table(
				TableSchema::new("users", "id")
					.column(ColumnMeta::new("id", NativeType::Integer))
					.column(ColumnMeta::new("email", NativeType::VarChar(255)))
					.column(
						ColumnMeta::new("created_at", NativeType::TimestampTz)
							.default_expr("now()"),
					)
					.column(
						ColumnMeta::new(
							"role",
							NativeType::Enum(
								"user_role".into(),
								vec!["admin".into(), "editor".into()],
							),
						)
						.default_expr("'editor'::user_role"),
					),
			)
			.build()
	}

	#[test]
	fn test_describe_normalizes_types() {
		let schema = sample_catalog().describe("users").unwrap();
		assert_eq!(schema.primary_key_field, "id");
		let by_name: BTreeMap<_, _> = schema
			.fields
			.iter()
			.map(|f| (f.column_name.as_str(), f))
			.collect();
		assert_eq!(by_name["id"].data_type, DataType::Integer);
		assert!(by_name["id"].is_primary_key);
		assert_eq!(by_name["email"].data_type, DataType::VarChar);
		assert_eq!(by_name["created_at"].data_type, DataType::DateTime);
		assert_eq!(
			by_name["role"].enum_values.as_deref(),
			Some(&["admin".to_string(), "editor".to_string()][..])
		);
	}

	#[test]
	fn test_describe_unknown_model() {
		let err = sample_catalog().describe("ghosts").unwrap_err();
		assert!(matches!(err, AdminError::SchemaNotFound(name) if name == "ghosts"));
	}
}
