//! Query executor boundary for the simpleblog admin framework
//!
//! The admin engine builds SQL with sea-query and hands finished statements
//! to a [`QueryExecutor`]. Rows come back as `serde_json` objects so the
//! engine can stay fully dynamic: it never knows a statically typed model.
//!
//! Two executors are provided, one per supported backend:
//! - [`SqliteExecutor`] backs the test suite with in-memory databases
//! - [`PgExecutor`] is the production backend

use async_trait::async_trait;
use thiserror::Error;

mod postgres;
mod sqlite;

pub use postgres::PgExecutor;
pub use sqlite::SqliteExecutor;

/// A single result row, keyed by column name.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

/// Database access error.
#[derive(Debug, Error)]
pub enum DbError {
	/// Connection could not be established
	#[error("connection error: {0}")]
	Connect(String),

	/// Statement execution failed
	#[error("query error: {0}")]
	Query(String),

	/// A value could not be decoded into JSON
	#[error("decode error on column '{column}': {message}")]
	Decode { column: String, message: String },
}

/// Result type alias for executor operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQL dialect the executor speaks.
///
/// The engine renders sea-query statements with the matching query builder
/// before handing the SQL string to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBackend {
	Postgres,
	Sqlite,
}

/// Backend-agnostic statement execution.
///
/// Implementations receive fully rendered SQL (values inlined by sea-query)
/// and return rows as JSON objects. The trait is intentionally small: it is
/// the entire surface the admin core is allowed to consume.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
	/// The dialect this executor expects.
	fn backend(&self) -> SqlBackend;

	/// Run a SELECT and collect every row.
	async fn fetch_all(&self, sql: &str) -> DbResult<Vec<JsonRow>>;

	/// Run a SELECT expected to match at most one row.
	async fn fetch_optional(&self, sql: &str) -> DbResult<Option<JsonRow>>;

	/// Run an INSERT/UPDATE/DELETE and return the number of affected rows.
	async fn execute(&self, sql: &str) -> DbResult<u64>;
}
