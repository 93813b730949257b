//! Model definition registry
//!
//! Declarative per-model configuration, assembled once at process start.
//! Registration cross-checks every definition against the schema catalog so
//! misconfigured models fail at startup instead of at request time.

use crate::actions::ActionHandler;
use crate::schema::SchemaCatalog;
use crate::types::{ActionDef, AdminError, AdminResult};
use crate::validate::FieldValidator;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pseudo display field resolving to the primary key column.
pub const PK_FIELD: &str = "pk";

/// Prefix marking a search field as exact-match (id lookup) instead of
/// substring match.
pub const EXACT_PREFIX: char = '#';

/// A child collection edited alongside its parent.
#[derive(Debug, Clone)]
pub struct InlineDefinition {
	pub model_key: String,
	pub label: String,
	pub default_expanded: bool,
	/// Field subset shown in the inline form; empty means all fields.
	pub fields: Vec<String>,
	pub max_items: Option<u32>,
	pub can_add: bool,
	pub can_delete: bool,
	pub layout: Option<String>,
	/// Column on the CHILD table pointing back at this parent.
	pub foreign_key_field: String,
}

impl InlineDefinition {
	pub fn new(
		model_key: impl Into<String>,
		label: impl Into<String>,
		foreign_key_field: impl Into<String>,
	) -> Self {
		Self {
			model_key: model_key.into(),
			label: label.into(),
			default_expanded: false,
			fields: Vec::new(),
			max_items: None,
			can_add: true,
			can_delete: true,
			layout: None,
			foreign_key_field: foreign_key_field.into(),
		}
	}

	pub fn expanded(mut self) -> Self {
		self.default_expanded = true;
		self
	}

	pub fn fields(mut self, fields: &[&str]) -> Self {
		self.fields = fields.iter().map(|f| f.to_string()).collect();
		self
	}

	pub fn max_items(mut self, max: u32) -> Self {
		self.max_items = Some(max);
		self
	}

	pub fn layout(mut self, layout: impl Into<String>) -> Self {
		self.layout = Some(layout.into());
		self
	}
}

impl From<&InlineDefinition> for crate::types::InlineMeta {
	fn from(inline: &InlineDefinition) -> Self {
		Self {
			model_key: inline.model_key.clone(),
			label: inline.label.clone(),
			default_expanded: inline.default_expanded,
			fields: inline.fields.clone(),
			max_items: inline.max_items,
			can_add: inline.can_add,
			can_delete: inline.can_delete,
			layout: inline.layout.clone(),
			foreign_key_field: inline.foreign_key_field.clone(),
		}
	}
}

/// Static configuration for one registered model.
#[derive(Clone)]
pub struct ModelDefinition {
	pub storage_model: String,
	pub display_name: String,
	pub list_display_fields: Vec<String>,
	pub search_fields: Vec<String>,
	pub list_filter_fields: Vec<String>,
	pub actions: Vec<ActionDef>,
	pub inlines: Vec<InlineDefinition>,
	pub readonly_fields: Vec<String>,
	pub exclude_fields: Vec<String>,
	pub field_widgets: BTreeMap<String, String>,
	pub field_labels: BTreeMap<String, String>,
	pub validators: BTreeMap<String, Arc<dyn FieldValidator>>,
	pub action_handlers: BTreeMap<String, Arc<dyn ActionHandler>>,
	pub can_add_item: bool,
}

impl ModelDefinition {
	pub fn builder(
		storage_model: impl Into<String>,
		display_name: impl Into<String>,
	) -> ModelDefinitionBuilder {
		ModelDefinitionBuilder {
			definition: ModelDefinition {
				storage_model: storage_model.into(),
				display_name: display_name.into(),
				list_display_fields: Vec::new(),
				search_fields: Vec::new(),
				list_filter_fields: Vec::new(),
				actions: Vec::new(),
				inlines: Vec::new(),
				readonly_fields: Vec::new(),
				exclude_fields: Vec::new(),
				field_widgets: BTreeMap::new(),
				field_labels: BTreeMap::new(),
				validators: BTreeMap::new(),
				action_handlers: BTreeMap::new(),
				can_add_item: true,
			},
		}
	}

	pub fn action_def(&self, key: &str) -> Option<&ActionDef> {
		self.actions.iter().find(|a| a.key == key)
	}

	pub fn inline(&self, model_key: &str) -> Option<&InlineDefinition> {
		self.inlines.iter().find(|i| i.model_key == model_key)
	}
}

// Validators and action handlers are trait objects, so only their keys are
// printable.
impl std::fmt::Debug for ModelDefinition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ModelDefinition")
			.field("storage_model", &self.storage_model)
			.field("display_name", &self.display_name)
			.field("list_display_fields", &self.list_display_fields)
			.field("search_fields", &self.search_fields)
			.field("list_filter_fields", &self.list_filter_fields)
			.field("actions", &self.actions)
			.field("inlines", &self.inlines)
			.field("readonly_fields", &self.readonly_fields)
			.field("exclude_fields", &self.exclude_fields)
			.field("field_widgets", &self.field_widgets)
			.field("field_labels", &self.field_labels)
			.field("validators", &self.validators.keys().collect::<Vec<_>>())
			.field(
				"action_handlers",
				&self.action_handlers.keys().collect::<Vec<_>>(),
			)
			.field("can_add_item", &self.can_add_item)
			.finish()
	}
}

pub struct ModelDefinitionBuilder {
	definition: ModelDefinition,
}

impl ModelDefinitionBuilder {
	pub fn list_display_fields(mut self, fields: &[&str]) -> Self {
		self.definition.list_display_fields = fields.iter().map(|f| f.to_string()).collect();
		self
	}

	pub fn search_fields(mut self, fields: &[&str]) -> Self {
		self.definition.search_fields = fields.iter().map(|f| f.to_string()).collect();
		self
	}

	pub fn list_filter_fields(mut self, fields: &[&str]) -> Self {
		self.definition.list_filter_fields = fields.iter().map(|f| f.to_string()).collect();
		self
	}

	pub fn action(mut self, action: ActionDef) -> Self {
		self.definition.actions.push(action);
		self
	}

	pub fn inline(mut self, inline: InlineDefinition) -> Self {
		self.definition.inlines.push(inline);
		self
	}

	pub fn readonly_fields(mut self, fields: &[&str]) -> Self {
		self.definition.readonly_fields = fields.iter().map(|f| f.to_string()).collect();
		self
	}

	pub fn exclude_fields(mut self, fields: &[&str]) -> Self {
		self.definition.exclude_fields = fields.iter().map(|f| f.to_string()).collect();
		self
	}

	pub fn field_widget(mut self, field: impl Into<String>, widget: impl Into<String>) -> Self {
		self.definition
			.field_widgets
			.insert(field.into(), widget.into());
		self
	}

	pub fn field_label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
		self.definition
			.field_labels
			.insert(field.into(), label.into());
		self
	}

	pub fn validator(
		mut self,
		field: impl Into<String>,
		validator: Arc<dyn FieldValidator>,
	) -> Self {
		self.definition.validators.insert(field.into(), validator);
		self
	}

	pub fn action_handler(
		mut self,
		action_key: impl Into<String>,
		handler: Arc<dyn ActionHandler>,
	) -> Self {
		self.definition
			.action_handlers
			.insert(action_key.into(), handler);
		self
	}

	pub fn disallow_add(mut self) -> Self {
		self.definition.can_add_item = false;
		self
	}

	pub fn build(self) -> ModelDefinition {
		self.definition
	}
}

/// Registry of model key → definition, validated against the catalog.
pub struct AdminRegistry {
	definitions: BTreeMap<String, ModelDefinition>,
}

impl std::fmt::Debug for AdminRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AdminRegistry")
			.field("definitions", &self.definitions)
			.finish()
	}
}

impl AdminRegistry {
	pub fn builder() -> AdminRegistryBuilder {
		AdminRegistryBuilder {
			definitions: BTreeMap::new(),
		}
	}

	pub fn resolve(&self, model_key: &str) -> AdminResult<&ModelDefinition> {
		self.definitions
			.get(model_key)
			.ok_or_else(|| AdminError::UnknownModel(model_key.to_string()))
	}

	/// `model key → display name` for every registered model.
	pub fn list_models(&self) -> BTreeMap<String, String> {
		self.definitions
			.iter()
			.map(|(key, def)| (key.clone(), def.display_name.clone()))
			.collect()
	}

	/// Find the registered definition whose storage model matches, used for
	/// relation label resolution.
	pub fn definition_for_storage(&self, storage_model: &str) -> Option<(&str, &ModelDefinition)> {
		self.definitions
			.iter()
			.find(|(_, def)| def.storage_model == storage_model)
			.map(|(key, def)| (key.as_str(), def))
	}
}

pub struct AdminRegistryBuilder {
	definitions: BTreeMap<String, ModelDefinition>,
}

impl AdminRegistryBuilder {
	pub fn register(mut self, model_key: impl Into<String>, definition: ModelDefinition) -> Self {
		self.definitions.insert(model_key.into(), definition);
		self
	}

	/// Validate every definition against the catalog and freeze the registry.
	pub fn build(self, catalog: &SchemaCatalog) -> AdminResult<AdminRegistry> {
		for (key, def) in &self.definitions {
			let schema = catalog.describe(&def.storage_model).map_err(|_| {
				AdminError::InvalidDefinition {
					model: key.clone(),
					message: format!("storage model '{}' is not in the catalog", def.storage_model),
				}
			})?;
			let columns: Vec<&str> = schema
				.fields
				.iter()
				.map(|f| f.column_name.as_str())
				.collect();
			let relation_aliases: Vec<&str> = schema
				.relations
				.iter()
				.map(|r| r.from_field.as_str())
				.collect();
			let known = |field: &str| {
				field == PK_FIELD
					|| columns.contains(&field)
					|| relation_aliases.contains(&field)
			};
			for field in &def.list_display_fields {
				if !known(field) {
					return Err(AdminError::InvalidDefinition {
						model: key.clone(),
						message: format!("list display field '{}' is not a column", field),
					});
				}
			}
			for field in &def.search_fields {
				let name = field.trim_start_matches(EXACT_PREFIX);
				if !known(name) {
					return Err(AdminError::InvalidDefinition {
						model: key.clone(),
						message: format!("search field '{}' is not a column", name),
					});
				}
			}
			for inline in &def.inlines {
				if !self.definitions.contains_key(&inline.model_key) {
					return Err(AdminError::InvalidDefinition {
						model: key.clone(),
						message: format!("inline model '{}' is not registered", inline.model_key),
					});
				}
			}
		}
		Ok(AdminRegistry {
			definitions: self.definitions,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{ColumnMeta, NativeType, TableSchema};

	fn catalog() -> SchemaCatalog {
		SchemaCatalog::builder()
			.table(
				TableSchema::new("users", "id")
					.column(ColumnMeta::new("id", NativeType::Integer))
					.column(ColumnMeta::new("email", NativeType::VarChar(255))),
			)
			.build()
	}

	#[test]
	fn test_resolve_unknown_model() {
		let registry = AdminRegistry::builder().build(&catalog()).unwrap();
		let err = registry.resolve("user").unwrap_err();
		assert!(matches!(err, AdminError::UnknownModel(key) if key == "user"));
	}

	#[test]
	fn test_pk_pseudo_field_is_accepted() {
		let def = ModelDefinition::builder("users", "Users")
			.list_display_fields(&["pk", "email"])
			.build();
		let registry = AdminRegistry::builder()
			.register("user", def)
			.build(&catalog())
			.unwrap();
		assert_eq!(registry.list_models()["user"], "Users");
	}

	#[test]
	fn test_unknown_display_field_is_rejected() {
		let def = ModelDefinition::builder("users", "Users")
			.list_display_fields(&["id", "nickname"])
			.build();
		let err = AdminRegistry::builder()
			.register("user", def)
			.build(&catalog())
			.unwrap_err();
		assert!(matches!(err, AdminError::InvalidDefinition { .. }));
	}

	#[test]
	fn test_exact_prefix_is_stripped_for_validation() {
		let def = ModelDefinition::builder("users", "Users")
			.search_fields(&["#id", "email"])
			.build();
		assert!(
			AdminRegistry::builder()
				.register("user", def)
				.build(&catalog())
				.is_ok()
		);
	}

	#[test]
	fn test_unregistered_inline_is_rejected() {
		let def = ModelDefinition::builder("users", "Users")
			.inline(InlineDefinition::new("ghost", "Ghosts", "user_id"))
			.build();
		let err = AdminRegistry::builder()
			.register("user", def)
			.build(&catalog())
			.unwrap_err();
		assert!(matches!(err, AdminError::InvalidDefinition { .. }));
	}
}
