//! Metadata-driven admin engine
//!
//! Given a declarative model definition and a schema catalog, this crate
//! lists, filters, searches, creates, edits and bulk-actions rows of any
//! registered model through one generic engine, including one-to-many
//! "inline" child collections saved together with their parent and
//! autocomplete-driven foreign-key resolution.
//!
//! The crate never talks HTTP and never owns a connection: callers hand it
//! an executor implementing [`simpleblog_db::QueryExecutor`] and get plain
//! data structures back.

pub mod actions;
pub mod engine;
pub mod query;
pub mod registry;
pub mod schema;
pub mod types;
pub mod validate;

pub use actions::{delete_selected_action, ActionHandler, ActionOutcome, DELETE_SELECTED};
pub use engine::AdminEngine;
pub use query::{ListQuery, PAGE_SIZE};
pub use registry::{AdminRegistry, InlineDefinition, ModelDefinition, EXACT_PREFIX, PK_FIELD};
pub use schema::{ColumnMeta, ModelSchema, NativeType, RelationMeta, SchemaCatalog, TableSchema};
pub use types::{
	ActionDef, AdminError, AdminResult, Choice, DataType, ErrorDetail, FieldDescriptor,
	FieldError, IdSelector, InlineMeta, InlineSaveBatch, ItemResult, ListResult, PostResult,
	RelationDescriptor,
};
pub use validate::{
	ColorValidator, EmailValidator, FieldValidationError, FieldValidator, SlugValidator,
};
