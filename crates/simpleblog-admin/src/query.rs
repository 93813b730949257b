//! Query compilation
//!
//! Turns list parameters into sea-query statements rendered per backend,
//! values inlined. Filter predicates are typed by the target column: booleans
//! compare by equality, date-like columns take `__$gte`/`__$lte` range
//! bounds, text columns match case-insensitively, everything else is
//! equality. Unknown filter keys are skipped, never errors.

use crate::registry::{EXACT_PREFIX, PK_FIELD};
use crate::schema::ModelSchema;
use crate::types::DataType;
use sea_query::{
	Alias, Condition, Expr, ExprTrait, Func, Order, PostgresQueryBuilder, QueryStatementWriter,
	SqliteQueryBuilder,
};
use simpleblog_db::SqlBackend;
use std::collections::BTreeMap;

/// Fixed page size for every list view.
pub const PAGE_SIZE: u64 = 100;

/// Range-bound filter key suffixes.
pub const GTE_SUFFIX: &str = "__$gte";
pub const LTE_SUFFIX: &str = "__$lte";

/// Parsed list parameters.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
	/// Zero-based page number.
	pub page: u64,
	pub filters: BTreeMap<String, serde_json::Value>,
	pub search_term: Option<String>,
	/// Signed 1-based index into the display fields; 0 or absent means
	/// natural order.
	pub ordering: Option<i64>,
}

/// Render a finished statement into SQL for the executor's backend.
pub fn render<S: QueryStatementWriter>(stmt: &S, backend: SqlBackend) -> String {
	match backend {
		SqlBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
		SqlBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
	}
}

/// Convert a JSON scalar to an inlined SQL value.
pub fn json_to_sea_value(value: &serde_json::Value) -> sea_query::Value {
	match value {
		serde_json::Value::String(s) => s.clone().into(),
		serde_json::Value::Bool(b) => (*b).into(),
		serde_json::Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				i.into()
			} else {
				n.as_f64().unwrap_or(0.0).into()
			}
		}
		serde_json::Value::Null => sea_query::Value::Int(None),
		other => other.to_string().into(),
	}
}

fn truthy(value: &serde_json::Value) -> bool {
	match value {
		serde_json::Value::Bool(b) => *b,
		serde_json::Value::String(s) => matches!(s.as_str(), "true" | "1" | "on"),
		serde_json::Value::Number(n) => n.as_i64() == Some(1),
		_ => false,
	}
}

fn ci_like(column: &str, term: &str) -> sea_query::SimpleExpr {
	Func::lower(Expr::col(Alias::new(column)))
		.like(format!("%{}%", term.to_lowercase()))
}

/// AND-combined condition from the filter map.
pub fn filter_condition(
	schema: &ModelSchema,
	filters: &BTreeMap<String, serde_json::Value>,
) -> Condition {
	let mut condition = Condition::all();
	for (key, value) in filters {
		if value.is_null() {
			continue;
		}
		if let Some(field_name) = key.strip_suffix(GTE_SUFFIX) {
			if schema.fields.iter().any(|f| f.column_name == field_name) {
				condition = condition
					.add(Expr::col(Alias::new(field_name)).gte(json_to_sea_value(value)));
			}
			continue;
		}
		if let Some(field_name) = key.strip_suffix(LTE_SUFFIX) {
			if schema.fields.iter().any(|f| f.column_name == field_name) {
				condition = condition
					.add(Expr::col(Alias::new(field_name)).lte(json_to_sea_value(value)));
			}
			continue;
		}
		let Some(field) = schema.fields.iter().find(|f| f.column_name == *key) else {
			continue;
		};
		let col = Expr::col(Alias::new(key.as_str()));
		let expr = match field.data_type {
			DataType::Boolean => col.eq(truthy(value)),
			dt if dt.is_text_like() => match value.as_str() {
				Some(s) => ci_like(key, s),
				None => col.eq(json_to_sea_value(value)),
			},
			_ => col.eq(json_to_sea_value(value)),
		};
		condition = condition.add(expr);
	}
	condition
}

/// OR-combined search condition across the declared search fields.
/// `#`-prefixed fields match exactly; the rest match by substring.
pub fn search_condition(
	schema: &ModelSchema,
	search_fields: &[String],
	term: &str,
) -> Option<Condition> {
	let term = term.trim();
	if term.is_empty() || search_fields.is_empty() {
		return None;
	}
	let mut condition = Condition::any();
	for field in search_fields {
		if let Some(name) = field.strip_prefix(EXACT_PREFIX) {
			let name = if name == PK_FIELD {
				schema.primary_key_field.as_str()
			} else {
				name
			};
			let value: sea_query::Value = match term.parse::<i64>() {
				Ok(i) => i.into(),
				Err(_) => term.to_string().into(),
			};
			condition = condition.add(Expr::col(Alias::new(name)).eq(value));
		} else {
			condition = condition.add(ci_like(field, term));
		}
	}
	Some(condition)
}

/// Resolve a signed 1-based ordering index into a column and direction.
/// Returns `None` for 0, absent, or out-of-range indexes (natural order).
pub fn ordering_column(
	schema: &ModelSchema,
	list_display_fields: &[String],
	ordering: Option<i64>,
) -> Option<(String, Order)> {
	let index = ordering?;
	if index == 0 {
		return None;
	}
	let direction = if index > 0 { Order::Asc } else { Order::Desc };
	let position = usize::try_from(index.unsigned_abs()).ok()?.checked_sub(1)?;
	let field = list_display_fields.get(position)?;
	let column = if field == PK_FIELD {
		schema.primary_key_field.clone()
	} else {
		field.clone()
	};
	Some((column, direction))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{ColumnMeta, NativeType, SchemaCatalog, TableSchema};
	use sea_query::{Asterisk, Query};

	fn post_schema() -> ModelSchema {
		SchemaCatalog::builder()
			.table(
				TableSchema::new("posts", "id")
					.column(ColumnMeta::new("id", NativeType::Integer))
					.column(ColumnMeta::new("title", NativeType::VarChar(255)))
					.column(ColumnMeta::new("published", NativeType::Boolean))
					.column(ColumnMeta::new("created_at", NativeType::TimestampTz)),
			)
			.build()
			.describe("posts")
			.unwrap()
	}

	fn render_where(condition: Condition) -> String {
		let stmt = Query::select()
			.column(Asterisk)
			.from(Alias::new("posts"))
			.cond_where(condition)
			.to_owned();
		render(&stmt, SqlBackend::Sqlite)
	}

	#[test]
	fn test_text_filter_is_case_insensitive_substring() {
		let mut filters = BTreeMap::new();
		filters.insert("title".to_string(), serde_json::json!("Rust"));
		let sql = render_where(filter_condition(&post_schema(), &filters));
		assert!(sql.contains("LOWER(\"title\") LIKE '%rust%'"), "{sql}");
	}

	#[test]
	fn test_boolean_filter_is_equality() {
		let mut filters = BTreeMap::new();
		filters.insert("published".to_string(), serde_json::json!("true"));
		let sql = render_where(filter_condition(&post_schema(), &filters));
		assert!(sql.contains("\"published\" = TRUE"), "{sql}");
	}

	#[test]
	fn test_range_suffixes_become_bounds() {
		let mut filters = BTreeMap::new();
		filters.insert("created_at__$gte".to_string(), serde_json::json!("2024-01-01"));
		filters.insert("created_at__$lte".to_string(), serde_json::json!("2024-12-31"));
		let sql = render_where(filter_condition(&post_schema(), &filters));
		assert!(sql.contains("\"created_at\" >= '2024-01-01'"), "{sql}");
		assert!(sql.contains("\"created_at\" <= '2024-12-31'"), "{sql}");
	}

	#[test]
	fn test_unknown_filter_key_is_skipped() {
		let mut filters = BTreeMap::new();
		filters.insert("no_such_column".to_string(), serde_json::json!("x"));
		let sql = render_where(filter_condition(&post_schema(), &filters));
		assert!(!sql.contains("no_such_column"), "{sql}");
	}

	#[test]
	fn test_search_mixes_exact_and_substring() {
		let fields = vec!["#id".to_string(), "title".to_string()];
		let condition = search_condition(&post_schema(), &fields, "42").unwrap();
		let sql = render_where(condition);
		assert!(sql.contains("\"id\" = 42"), "{sql}");
		assert!(sql.contains("LOWER(\"title\") LIKE '%42%'"), "{sql}");
	}

	#[test]
	fn test_empty_search_term_yields_no_condition() {
		let fields = vec!["title".to_string()];
		assert!(search_condition(&post_schema(), &fields, "  ").is_none());
	}

	#[test]
	fn test_ordering_sign_selects_direction() {
		let fields = vec!["pk".to_string(), "title".to_string()];
		let schema = post_schema();
		assert_eq!(
			ordering_column(&schema, &fields, Some(2)),
			Some(("title".to_string(), Order::Asc))
		);
		assert_eq!(
			ordering_column(&schema, &fields, Some(-2)),
			Some(("title".to_string(), Order::Desc))
		);
		assert_eq!(
			ordering_column(&schema, &fields, Some(1)),
			Some(("id".to_string(), Order::Asc))
		);
		assert_eq!(ordering_column(&schema, &fields, Some(0)), None);
		assert_eq!(ordering_column(&schema, &fields, Some(9)), None);
	}
}
