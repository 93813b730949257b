//! Bulk action dispatch
//!
//! Actions are named operations applied to a set of selected ids. The
//! engine provides `deleteSelected`; anything else is a custom handler
//! registered on the model definition. Confirmation metadata is advisory,
//! enforced by the UI before dispatch ever happens.

use crate::types::{ActionDef, AdminResult, FieldError};
use async_trait::async_trait;

/// Key of the built-in bulk delete action.
pub const DELETE_SELECTED: &str = "deleteSelected";

/// The standard `deleteSelected` action definition.
pub fn delete_selected_action() -> ActionDef {
	ActionDef {
		key: DELETE_SELECTED.to_string(),
		label: "Delete selected items".to_string(),
		requires_confirmation: true,
		confirmation_message: Some(
			"Are you sure you want to delete the selected items?".to_string(),
		),
	}
}

/// Outcome of one bulk action run. Per-item failures are collected, never
/// fail-fast, so partial success stays visible.
#[derive(Debug, Default)]
pub struct ActionOutcome {
	pub affected: u64,
	pub errors: Vec<FieldError>,
}

impl ActionOutcome {
	pub fn affected(count: u64) -> Self {
		Self {
			affected: count,
			errors: Vec::new(),
		}
	}
}

/// A custom bulk action registered on a model definition.
#[async_trait]
pub trait ActionHandler: Send + Sync {
	async fn handle(&self, actor: &str, ids: &[String]) -> AdminResult<ActionOutcome>;
}
