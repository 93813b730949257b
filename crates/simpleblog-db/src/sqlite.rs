//! SQLite executor
//!
//! Backs the test suite (`sqlite::memory:`) and small deployments. Column
//! values are decoded by the declared type name; anything unrecognized falls
//! back through integer, float and text decoding before giving up as null.

use crate::{DbError, DbResult, JsonRow, QueryExecutor, SqlBackend};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo};

/// [`QueryExecutor`] over a sqlx SQLite pool.
#[derive(Clone)]
pub struct SqliteExecutor {
	pool: SqlitePool,
}

impl SqliteExecutor {
	/// Connect to a SQLite database URL (e.g. `sqlite::memory:`).
	///
	/// In-memory databases are pinned to a single connection so every
	/// statement sees the same database.
	pub async fn connect(url: &str) -> DbResult<Self> {
		let max = if url.contains(":memory:") { 1 } else { 5 };
		let pool = SqlitePoolOptions::new()
			.max_connections(max)
			.connect(url)
			.await
			.map_err(|e| DbError::Connect(e.to_string()))?;
		Ok(Self { pool })
	}

	/// Wrap an existing pool.
	pub fn from_pool(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Access the underlying pool (test setup runs DDL through it).
	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}
}

fn row_to_json(row: &SqliteRow) -> JsonRow {
	let mut out = JsonRow::new();
	for column in row.columns() {
		let idx = column.ordinal();
		let value = decode_column(row, idx, column.type_info().name());
		out.insert(column.name().to_string(), value);
	}
	out
}

fn decode_column(row: &SqliteRow, idx: usize, type_name: &str) -> serde_json::Value {
	match type_name {
		"INTEGER" | "INT" | "BIGINT" => row
			.try_get::<Option<i64>, _>(idx)
			.ok()
			.flatten()
			.map(serde_json::Value::from)
			.unwrap_or(serde_json::Value::Null),
		"REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => row
			.try_get::<Option<f64>, _>(idx)
			.ok()
			.flatten()
			.map(serde_json::Value::from)
			.unwrap_or(serde_json::Value::Null),
		"BOOLEAN" => row
			.try_get::<Option<bool>, _>(idx)
			.ok()
			.flatten()
			.map(serde_json::Value::from)
			.unwrap_or(serde_json::Value::Null),
		"TEXT" | "VARCHAR" | "DATE" | "DATETIME" | "TIME" => row
			.try_get::<Option<String>, _>(idx)
			.ok()
			.flatten()
			.map(serde_json::Value::from)
			.unwrap_or(serde_json::Value::Null),
		// BLOB and expression columns without a declared type: probe the
		// common decodings in order.
		_ => row
			.try_get::<Option<i64>, _>(idx)
			.ok()
			.flatten()
			.map(serde_json::Value::from)
			.or_else(|| {
				row.try_get::<Option<f64>, _>(idx)
					.ok()
					.flatten()
					.map(serde_json::Value::from)
			})
			.or_else(|| {
				row.try_get::<Option<String>, _>(idx)
					.ok()
					.flatten()
					.map(serde_json::Value::from)
			})
			.unwrap_or(serde_json::Value::Null),
	}
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
	fn backend(&self) -> SqlBackend {
		SqlBackend::Sqlite
	}

	async fn fetch_all(&self, sql: &str) -> DbResult<Vec<JsonRow>> {
		tracing::trace!(sql, "sqlite fetch_all");
		let rows = sqlx::query(sql)
			.fetch_all(&self.pool)
			.await
			.map_err(|e| DbError::Query(e.to_string()))?;
		Ok(rows.iter().map(row_to_json).collect())
	}

	async fn fetch_optional(&self, sql: &str) -> DbResult<Option<JsonRow>> {
		tracing::trace!(sql, "sqlite fetch_optional");
		let row = sqlx::query(sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(|e| DbError::Query(e.to_string()))?;
		Ok(row.as_ref().map(row_to_json))
	}

	async fn execute(&self, sql: &str) -> DbResult<u64> {
		tracing::trace!(sql, "sqlite execute");
		let result = sqlx::query(sql)
			.execute(&self.pool)
			.await
			.map_err(|e| DbError::Query(e.to_string()))?;
		Ok(result.rows_affected())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_fetch_all_decodes_declared_types() {
		let db = SqliteExecutor::connect("sqlite::memory:").await.unwrap();
		db.execute(
			"CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, active BOOLEAN, score REAL)",
		)
		.await
		.unwrap();
		db.execute("INSERT INTO t (name, active, score) VALUES ('a', 1, 1.5)")
			.await
			.unwrap();

		let rows = db.fetch_all("SELECT * FROM t").await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0]["name"], serde_json::json!("a"));
		assert_eq!(rows[0]["active"], serde_json::json!(true));
		assert_eq!(rows[0]["score"], serde_json::json!(1.5));
	}

	#[tokio::test]
	async fn test_fetch_optional_missing_row() {
		let db = SqliteExecutor::connect("sqlite::memory:").await.unwrap();
		db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)")
			.await
			.unwrap();
		let row = db
			.fetch_optional("SELECT * FROM t WHERE id = 99")
			.await
			.unwrap();
		assert!(row.is_none());
	}

	#[tokio::test]
	async fn test_count_expression_column() {
		let db = SqliteExecutor::connect("sqlite::memory:").await.unwrap();
		db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)")
			.await
			.unwrap();
		db.execute("INSERT INTO t DEFAULT VALUES").await.unwrap();
		db.execute("INSERT INTO t DEFAULT VALUES").await.unwrap();

		let row = db
			.fetch_optional("SELECT COUNT(*) FROM t")
			.await
			.unwrap()
			.unwrap();
		let count = row.values().next().and_then(|v| v.as_i64());
		assert_eq!(count, Some(2));
	}
}
