//! PostgreSQL executor
//!
//! Decodes each column by its PG type name into JSON. Timestamps go out as
//! RFC 3339 strings, NUMERIC through [`rust_decimal`], and one-dimensional
//! text-like arrays as JSON arrays of strings.

use crate::{DbError, DbResult, JsonRow, QueryExecutor, SqlBackend};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use uuid::Uuid;

/// [`QueryExecutor`] over a sqlx PostgreSQL pool.
#[derive(Clone)]
pub struct PgExecutor {
	pool: PgPool,
}

impl PgExecutor {
	/// Connect to a PostgreSQL database URL.
	pub async fn connect(url: &str) -> DbResult<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(5)
			.connect(url)
			.await
			.map_err(|e| DbError::Connect(e.to_string()))?;
		Ok(Self { pool })
	}

	/// Wrap an existing pool.
	pub fn from_pool(pool: PgPool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}
}

fn row_to_json(row: &PgRow) -> DbResult<JsonRow> {
	let mut out = JsonRow::new();
	for column in row.columns() {
		let idx = column.ordinal();
		let value = decode_column(row, idx, column.type_info().name()).map_err(|e| {
			DbError::Decode {
				column: column.name().to_string(),
				message: e.to_string(),
			}
		})?;
		out.insert(column.name().to_string(), value);
	}
	Ok(out)
}

fn decode_column(
	row: &PgRow,
	idx: usize,
	type_name: &str,
) -> Result<serde_json::Value, sqlx::Error> {
	let value = match type_name {
		"INT2" => row
			.try_get::<Option<i16>, _>(idx)?
			.map(serde_json::Value::from),
		"INT4" => row
			.try_get::<Option<i32>, _>(idx)?
			.map(serde_json::Value::from),
		"INT8" => row
			.try_get::<Option<i64>, _>(idx)?
			.map(serde_json::Value::from),
		"FLOAT4" => row
			.try_get::<Option<f32>, _>(idx)?
			.map(serde_json::Value::from),
		"FLOAT8" => row
			.try_get::<Option<f64>, _>(idx)?
			.map(serde_json::Value::from),
		"BOOL" => row
			.try_get::<Option<bool>, _>(idx)?
			.map(serde_json::Value::from),
		"UUID" => row
			.try_get::<Option<Uuid>, _>(idx)?
			.map(|u| serde_json::Value::from(u.to_string())),
		"NUMERIC" => row
			.try_get::<Option<Decimal>, _>(idx)?
			.map(|d| serde_json::Value::from(d.to_string())),
		"TIMESTAMPTZ" => row
			.try_get::<Option<DateTime<Utc>>, _>(idx)?
			.map(|t| serde_json::Value::from(t.to_rfc3339())),
		"TIMESTAMP" => row
			.try_get::<Option<NaiveDateTime>, _>(idx)?
			.map(|t| serde_json::Value::from(t.and_utc().to_rfc3339())),
		"DATE" => row
			.try_get::<Option<NaiveDate>, _>(idx)?
			.map(|d| serde_json::Value::from(d.to_string())),
		"JSON" | "JSONB" => row.try_get::<Option<serde_json::Value>, _>(idx)?,
		name if name.ends_with("[]") => row
			.try_get::<Option<Vec<String>>, _>(idx)?
			.map(|v| serde_json::Value::from(v)),
		// TEXT, VARCHAR, CHAR, NAME, user-defined enum types.
		_ => row
			.try_get::<Option<String>, _>(idx)?
			.map(serde_json::Value::from),
	};
	Ok(value.unwrap_or(serde_json::Value::Null))
}

#[async_trait]
impl QueryExecutor for PgExecutor {
	fn backend(&self) -> SqlBackend {
		SqlBackend::Postgres
	}

	async fn fetch_all(&self, sql: &str) -> DbResult<Vec<JsonRow>> {
		tracing::trace!(sql, "postgres fetch_all");
		let rows = sqlx::query(sql)
			.fetch_all(&self.pool)
			.await
			.map_err(|e| DbError::Query(e.to_string()))?;
		rows.iter().map(row_to_json).collect()
	}

	async fn fetch_optional(&self, sql: &str) -> DbResult<Option<JsonRow>> {
		tracing::trace!(sql, "postgres fetch_optional");
		let row = sqlx::query(sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(|e| DbError::Query(e.to_string()))?;
		row.as_ref().map(row_to_json).transpose()
	}

	async fn execute(&self, sql: &str) -> DbResult<u64> {
		tracing::trace!(sql, "postgres execute");
		let result = sqlx::query(sql)
			.execute(&self.pool)
			.await
			.map_err(|e| DbError::Query(e.to_string()))?;
		Ok(result.rows_affected())
	}
}
