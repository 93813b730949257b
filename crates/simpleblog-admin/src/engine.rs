//! Admin model engine
//!
//! One implementation parameterized by model definitions: list querying,
//! item retrieval and metadata assembly, generic create/update/delete, the
//! inline save protocol, bulk action dispatch and autocomplete resolution.
//! The engine is stateless between calls; filter and selection context is
//! resupplied by the caller on every request.

use crate::actions::{ActionOutcome, DELETE_SELECTED};
use crate::query::{
	self, filter_condition, json_to_sea_value, ordering_column, search_condition, ListQuery,
	PAGE_SIZE,
};
use crate::registry::{AdminRegistry, InlineDefinition, ModelDefinition, PK_FIELD};
use crate::schema::{ModelSchema, SchemaCatalog};
use crate::types::{
	AdminError, AdminResult, Choice, DataType, FieldDescriptor, FieldError, IdSelector,
	InlineItems, InlineMeta, InlineSaveBatch, ItemResult, ListResult, PostResult,
};
use crate::validate::{validate_payload, WriteMode};
use chrono::Utc;
use sea_query::{Alias, Asterisk, Condition, Expr, ExprTrait, Order, Query};
use simpleblog_db::{JsonRow, QueryExecutor};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Candidate cap for autocomplete responses.
const AUTOCOMPLETE_LIMIT: u64 = 20;

pub struct AdminEngine {
	registry: Arc<AdminRegistry>,
	catalog: Arc<SchemaCatalog>,
	executor: Arc<dyn QueryExecutor>,
}

impl AdminEngine {
	pub fn new(
		registry: Arc<AdminRegistry>,
		catalog: Arc<SchemaCatalog>,
		executor: Arc<dyn QueryExecutor>,
	) -> Self {
		Self {
			registry,
			catalog,
			executor,
		}
	}

	pub fn registry(&self) -> &AdminRegistry {
		&self.registry
	}

	/// Registered model keys and their display names.
	pub fn list_models(&self) -> BTreeMap<String, String> {
		self.registry.list_models()
	}

	fn resolve(&self, model_key: &str) -> AdminResult<(&ModelDefinition, ModelSchema)> {
		let definition = self.registry.resolve(model_key)?;
		let schema = self.catalog.describe(&definition.storage_model)?;
		Ok((definition, schema))
	}

	fn render<S: sea_query::QueryStatementWriter>(&self, stmt: &S) -> String {
		query::render(stmt, self.executor.backend())
	}

	fn pk_sea_value(schema: &ModelSchema, id: &str) -> sea_query::Value {
		let integer_pk = schema
			.fields
			.iter()
			.any(|f| f.is_primary_key && f.data_type == DataType::Integer);
		if integer_pk {
			match id.parse::<i64>() {
				Ok(i) => i.into(),
				Err(_) => id.to_string().into(),
			}
		} else {
			id.to_string().into()
		}
	}

	fn visible_fields(definition: &ModelDefinition, schema: &ModelSchema) -> Vec<FieldDescriptor> {
		schema
			.fields
			.iter()
			.filter(|f| !definition.exclude_fields.contains(&f.column_name))
			.cloned()
			.collect()
	}

	/// Mirror the primary key under `$pk` so clients can address rows
	/// uniformly even when the pk column has a domain name.
	fn attach_pk_alias(schema: &ModelSchema, row: &mut JsonRow) {
		if schema.primary_key_field != "id" {
			if let Some(pk) = row.get(&schema.primary_key_field).cloned() {
				row.insert("$pk".to_string(), pk);
			}
		}
	}

	async fn count_where(&self, table: &str, condition: Condition) -> AdminResult<u64> {
		let stmt = Query::select()
			.expr_as(Expr::cust("COUNT(*)"), Alias::new("total"))
			.from(Alias::new(table))
			.cond_where(condition)
			.to_owned();
		let row = self.executor.fetch_optional(&self.render(&stmt)).await?;
		Ok(row
			.and_then(|r| r.get("total").and_then(|v| v.as_u64()))
			.unwrap_or(0))
	}

	async fn fetch_by_pk(
		&self,
		table: &str,
		schema: &ModelSchema,
		id: &str,
	) -> AdminResult<Option<JsonRow>> {
		let stmt = Query::select()
			.column(Asterisk)
			.from(Alias::new(table))
			.and_where(
				Expr::col(Alias::new(schema.primary_key_field.as_str()))
					.eq(Self::pk_sea_value(schema, id)),
			)
			.to_owned();
		Ok(self.executor.fetch_optional(&self.render(&stmt)).await?)
	}

	/// Paginated, filtered, searched and ordered list view.
	pub async fn list_items(&self, model_key: &str, list: &ListQuery) -> AdminResult<ListResult> {
		let (definition, schema) = self.resolve(model_key)?;
		let table = definition.storage_model.as_str();

		let mut condition = Condition::all().add(filter_condition(&schema, &list.filters));
		if let Some(term) = &list.search_term {
			if let Some(search) = search_condition(&schema, &definition.search_fields, term) {
				condition = condition.add(search);
			}
		}

		let total = self.count_where(table, condition.clone()).await?;

		let mut stmt = Query::select()
			.column(Asterisk)
			.from(Alias::new(table))
			.cond_where(condition)
			.to_owned();
		if let Some((column, direction)) =
			ordering_column(&schema, &definition.list_display_fields, list.ordering)
		{
			stmt.order_by(Alias::new(column.as_str()), direction);
		}
		// untrusted page number: keep the offset within the backends' bigint
		let offset = Ord::min(list.page.saturating_mul(PAGE_SIZE), i64::MAX as u64);
		stmt.limit(PAGE_SIZE).offset(offset);

		let mut items = self.executor.fetch_all(&self.render(&stmt)).await?;
		for row in &mut items {
			Self::attach_pk_alias(&schema, row);
		}
		let items_count = items.len() as u64;

		Ok(ListResult {
			items,
			total,
			items_count,
			list_display_fields: definition.list_display_fields.clone(),
			search_fields: definition.search_fields.clone(),
			actions: definition.actions.clone(),
			can_add_item: definition.can_add_item,
			list_filter_fields: definition.list_filter_fields.clone(),
			fields_and_types: Self::visible_fields(definition, &schema),
		})
	}

	/// Choice lists for enum columns and prefetchable relations.
	async fn assemble_filter_types(
		&self,
		schema: &ModelSchema,
	) -> AdminResult<BTreeMap<String, Vec<Choice>>> {
		let mut filter_types = BTreeMap::new();
		for field in &schema.fields {
			if let Some(values) = &field.enum_values {
				let choices = values
					.iter()
					.map(|v| Choice {
						value: serde_json::Value::from(v.clone()),
						label: v.clone(),
					})
					.collect();
				filter_types.insert(field.column_name.clone(), choices);
			}
		}
		for relation in &schema.relations {
			if !relation.is_prefetch_choice {
				continue;
			}
			let label_column = self.relation_label_column(&relation.to_model, &relation.to_field);
			let stmt = Query::select()
				.column(Alias::new(relation.to_field.as_str()))
				.column(Alias::new(label_column.as_str()))
				.from(Alias::new(relation.to_model.as_str()))
				.order_by(Alias::new(label_column.as_str()), Order::Asc)
				.to_owned();
			let rows = self.executor.fetch_all(&self.render(&stmt)).await?;
			let choices = rows
				.into_iter()
				.map(|row| {
					let value = row
						.get(&relation.to_field)
						.cloned()
						.unwrap_or(serde_json::Value::Null);
					let label = row
						.get(&label_column)
						.and_then(|v| v.as_str().map(str::to_string))
						.unwrap_or_else(|| value.to_string());
					Choice { value, label }
				})
				.collect();
			filter_types.insert(relation.from_field.clone(), choices);
		}
		Ok(filter_types)
	}

	/// The column used as a row's human-readable title: the target model's
	/// first non-pk display field, falling back to the joined column.
	fn relation_label_column(&self, storage_model: &str, to_field: &str) -> String {
		self.registry
			.definition_for_storage(storage_model)
			.and_then(|(_, def)| {
				def.list_display_fields
					.iter()
					.find(|f| *f != PK_FIELD && *f != to_field)
					.cloned()
			})
			.unwrap_or_else(|| to_field.to_string())
	}

	fn materialize_default(field: &FieldDescriptor, schema: &ModelSchema) -> Option<String> {
		let default = field.column_default.as_deref();
		match field.data_type {
			DataType::Enum => default.map(|d| {
				d.split("::")
					.next()
					.unwrap_or(d)
					.trim_matches('\'')
					.to_string()
			}),
			DataType::Date | DataType::DateTime | DataType::Timestamp => {
				default.map(|d| {
					if d.to_lowercase().contains("now") || d.contains("CURRENT_TIMESTAMP") {
						Utc::now().to_rfc3339()
					} else {
						d.trim_matches('\'').to_string()
					}
				})
			}
			DataType::Array => default.map(|d| {
				let inner = d
					.trim_start_matches("ARRAY[")
					.trim_start_matches("'{")
					.trim_end_matches(']')
					.trim_end_matches("}'");
				inner
					.split(',')
					.map(|e| e.trim().trim_matches('\'').to_string())
					.filter(|e| !e.is_empty())
					.collect::<Vec<_>>()
					.join("\n")
			}),
			DataType::Uuid => {
				let has_relation = schema
					.relations
					.iter()
					.any(|r| r.from_field == field.column_name);
				match default {
					Some(d) => Some(d.to_string()),
					// Pre-assign an id the optimistic UI can reference
					// before the row exists.
					None if field.is_nullable && !has_relation => {
						Some(Uuid::new_v4().to_string())
					}
					None => None,
				}
			}
			_ => default.map(|d| d.trim_matches('\'').to_string()),
		}
	}

	/// Metadata for the create form: no item, but defaults materialized so
	/// the client can pre-fill fields.
	pub async fn item_metadata(&self, model_key: &str) -> AdminResult<ItemResult> {
		let (definition, schema) = self.resolve(model_key)?;
		let fields = Self::visible_fields(definition, &schema)
			.into_iter()
			.map(|mut field| {
				field.column_default = Self::materialize_default(&field, &schema);
				field
			})
			.collect();
		let filter_types = self.assemble_filter_types(&schema).await?;
		let inline_items = definition
			.inlines
			.iter()
			.map(|inline| {
				(
					inline.model_key.clone(),
					InlineItems {
						items: Vec::new(),
						exclude: Some(vec![inline.foreign_key_field.clone()]),
					},
				)
			})
			.collect();
		Ok(ItemResult {
			item: None,
			fields_and_types: fields,
			filter_types,
			relations: schema.relations.clone(),
			readonly_fields: definition.readonly_fields.clone(),
			field_labels: definition.field_labels.clone(),
			field_widgets: definition.field_widgets.clone(),
			inlines: definition.inlines.iter().map(InlineMeta::from).collect(),
			inline_items,
		})
	}

	/// Single item with relation labels resolved and inline child ids
	/// attached.
	pub async fn get_item(&self, model_key: &str, id: &str) -> AdminResult<ItemResult> {
		let (definition, schema) = self.resolve(model_key)?;
		let table = definition.storage_model.as_str();

		let mut item = self
			.fetch_by_pk(table, &schema, id)
			.await?
			.ok_or_else(|| AdminError::ItemNotFound {
				model: model_key.to_string(),
				id: id.to_string(),
			})?;
		Self::attach_pk_alias(&schema, &mut item);

		// resolve relation labels in the same round trip
		for relation in &schema.relations {
			let Some(value) = item.get(&relation.from_field) else {
				continue;
			};
			if value.is_null() {
				continue;
			}
			let label_column = self.relation_label_column(&relation.to_model, &relation.to_field);
			let stmt = Query::select()
				.column(Alias::new(label_column.as_str()))
				.from(Alias::new(relation.to_model.as_str()))
				.and_where(
					Expr::col(Alias::new(relation.to_field.as_str()))
						.eq(json_to_sea_value(value)),
				)
				.to_owned();
			if let Some(row) = self.executor.fetch_optional(&self.render(&stmt)).await? {
				if let Some(label) = row.get(&label_column) {
					item.insert(format!("{}__label", relation.from_field), label.clone());
				}
			}
		}

		let mut inline_items = BTreeMap::new();
		for inline in &definition.inlines {
			let ids = self.inline_child_ids(inline, &schema, id).await?;
			inline_items.insert(
				inline.model_key.clone(),
				InlineItems {
					items: ids,
					exclude: Some(vec![inline.foreign_key_field.clone()]),
				},
			);
		}

		let filter_types = self.assemble_filter_types(&schema).await?;
		Ok(ItemResult {
			item: Some(item),
			fields_and_types: Self::visible_fields(definition, &schema),
			filter_types,
			relations: schema.relations.clone(),
			readonly_fields: definition.readonly_fields.clone(),
			field_labels: definition.field_labels.clone(),
			field_widgets: definition.field_widgets.clone(),
			inlines: definition.inlines.iter().map(InlineMeta::from).collect(),
			inline_items,
		})
	}

	async fn inline_child_ids(
		&self,
		inline: &InlineDefinition,
		parent_schema: &ModelSchema,
		parent_id: &str,
	) -> AdminResult<Vec<serde_json::Value>> {
		let child_def = self.registry.resolve(&inline.model_key)?;
		let child_schema = self.catalog.describe(&child_def.storage_model)?;
		let stmt = Query::select()
			.column(Alias::new(child_schema.primary_key_field.as_str()))
			.from(Alias::new(child_def.storage_model.as_str()))
			.and_where(
				Expr::col(Alias::new(inline.foreign_key_field.as_str()))
					.eq(Self::pk_sea_value(parent_schema, parent_id)),
			)
			.order_by(
				Alias::new(child_schema.primary_key_field.as_str()),
				Order::Asc,
			)
			.to_owned();
		let rows = self.executor.fetch_all(&self.render(&stmt)).await?;
		Ok(rows
			.into_iter()
			.filter_map(|row| row.get(&child_schema.primary_key_field).cloned())
			.collect())
	}

	async fn insert_row(
		&self,
		table: &str,
		schema: &ModelSchema,
		values: &JsonRow,
	) -> AdminResult<serde_json::Value> {
		let columns: Vec<Alias> = values.keys().map(|k| Alias::new(k.as_str())).collect();
		let exprs: Vec<sea_query::SimpleExpr> = values
			.values()
			.map(|v| json_to_sea_value(v).into())
			.collect();
		let mut stmt = Query::insert()
			.into_table(Alias::new(table))
			.columns(columns)
			.to_owned();
		stmt.values(exprs)
			.map_err(|e| AdminError::QueryBuild(e.to_string()))?;
		stmt.returning(Query::returning().column(Alias::new(schema.primary_key_field.as_str())));

		let row = self.executor.fetch_optional(&self.render(&stmt)).await?;
		Ok(row
			.and_then(|r| r.get(&schema.primary_key_field).cloned())
			.unwrap_or(serde_json::Value::Null))
	}

	async fn update_row(
		&self,
		table: &str,
		schema: &ModelSchema,
		id: &str,
		values: &JsonRow,
	) -> AdminResult<u64> {
		if values.is_empty() {
			return Ok(0);
		}
		let mut stmt = Query::update().table(Alias::new(table)).to_owned();
		for (column, value) in values {
			stmt.value(Alias::new(column.as_str()), json_to_sea_value(value));
		}
		stmt.and_where(
			Expr::col(Alias::new(schema.primary_key_field.as_str()))
				.eq(Self::pk_sea_value(schema, id)),
		);
		Ok(self.executor.execute(&self.render(&stmt)).await?)
	}

	/// Generic create. Validation failures come back as a `PostResult`
	/// error listing every failing field.
	pub async fn create_item(
		&self,
		model_key: &str,
		data: &serde_json::Map<String, serde_json::Value>,
	) -> AdminResult<PostResult> {
		let (definition, schema) = self.resolve(model_key)?;

		let outcome = validate_payload(definition, &schema, data, WriteMode::Create, None);
		if !outcome.errors.is_empty() {
			return Ok(PostResult::field_errors("Validation failed", outcome.errors));
		}

		let pk = self
			.insert_row(&definition.storage_model, &schema, &outcome.values)
			.await?;
		tracing::debug!(model = model_key, id = %pk, "created item");
		Ok(PostResult::success(
			"Created",
			serde_json::json!({ "$pk": pk }),
		))
	}

	/// Generic update, scoped to the fields present in `data`. A missing
	/// row yields an error result, not an error return, so the form can
	/// show it inline.
	pub async fn update_item(
		&self,
		model_key: &str,
		id: &str,
		data: &serde_json::Map<String, serde_json::Value>,
	) -> AdminResult<PostResult> {
		let (definition, schema) = self.resolve(model_key)?;
		let table = definition.storage_model.as_str();

		if self.fetch_by_pk(table, &schema, id).await?.is_none() {
			return Ok(PostResult::error_message(format!(
				"Item '{}' not found in model '{}'",
				id, model_key
			)));
		}

		let outcome = validate_payload(definition, &schema, data, WriteMode::Update, Some(id));
		if !outcome.errors.is_empty() {
			return Ok(PostResult::field_errors("Validation failed", outcome.errors));
		}

		self.update_row(table, &schema, id, &outcome.values).await?;
		tracing::debug!(model = model_key, id, "updated item");
		Ok(PostResult::success("Updated", serde_json::Value::Null))
	}

	/// The inline save protocol: update every existing child and create
	/// every new child across all submitted child models. Each item is
	/// attempted; failures land in the error map keyed by child model,
	/// tagged with the item's id or submitted index. Applied writes are
	/// not rolled back on sibling failure.
	pub async fn save_inlines(
		&self,
		model_key: &str,
		parent_id: &str,
		batch: &InlineSaveBatch,
	) -> AdminResult<PostResult> {
		let (definition, parent_schema) = self.resolve(model_key)?;

		if self
			.fetch_by_pk(&definition.storage_model, &parent_schema, parent_id)
			.await?
			.is_none()
		{
			return Ok(PostResult::error_message(format!(
				"Item '{}' not found in model '{}'",
				parent_id, model_key
			)));
		}

		let mut error_map: BTreeMap<String, Vec<FieldError>> = BTreeMap::new();

		for (child_key, items) in &batch.existing_items {
			let Some(inline) = definition.inline(child_key) else {
				error_map.entry(child_key.clone()).or_default().push(FieldError::new(
					child_key.clone(),
					format!("'{}' is not an inline of '{}'", child_key, model_key),
				));
				continue;
			};
			let child_def = self.registry.resolve(&inline.model_key)?;
			let child_schema = self.catalog.describe(&child_def.storage_model)?;
			for existing in items {
				let id = Self::id_as_string(&existing.id);
				let outcome = validate_payload(
					child_def,
					&child_schema,
					&existing.form_data,
					WriteMode::Update,
					Some(&id),
				);
				if !outcome.errors.is_empty() {
					let entry = error_map.entry(child_key.clone()).or_default();
					entry.extend(outcome.errors.into_iter().map(|mut e| {
						e.item = Some(id.clone());
						e
					}));
					continue;
				}
				match self
					.update_row(&child_def.storage_model, &child_schema, &id, &outcome.values)
					.await
				{
					Ok(affected) => {
						if affected == 0 && !outcome.values.is_empty() {
							error_map.entry(child_key.clone()).or_default().push(
								FieldError::for_item(
									child_schema.primary_key_field.clone(),
									"Item not found",
									id.clone(),
								),
							);
						}
					}
					// a rejected write fails this item only, the rest of the
					// batch is still attempted
					Err(AdminError::Database(e)) => {
						error_map.entry(child_key.clone()).or_default().push(
							FieldError::for_item(
								child_schema.primary_key_field.clone(),
								format!("Could not save: {}", e),
								id.clone(),
							),
						);
					}
					Err(other) => return Err(other),
				}
			}
		}

		for (child_key, items) in &batch.new_items {
			let Some(inline) = definition.inline(child_key) else {
				error_map.entry(child_key.clone()).or_default().push(FieldError::new(
					child_key.clone(),
					format!("'{}' is not an inline of '{}'", child_key, model_key),
				));
				continue;
			};
			let child_def = self.registry.resolve(&inline.model_key)?;
			let child_schema = self.catalog.describe(&child_def.storage_model)?;
			let parent_pk_json = Self::parent_fk_json(&parent_schema, parent_id);
			for new_item in items {
				let mut payload = new_item.form_data.clone();
				payload.insert(inline.foreign_key_field.clone(), parent_pk_json.clone());
				let outcome = validate_payload(
					child_def,
					&child_schema,
					&payload,
					WriteMode::Create,
					None,
				);
				if !outcome.errors.is_empty() {
					let idx = new_item.idx.to_string();
					let entry = error_map.entry(child_key.clone()).or_default();
					entry.extend(outcome.errors.into_iter().map(|mut e| {
						e.item = Some(idx.clone());
						e
					}));
					continue;
				}
				match self
					.insert_row(&child_def.storage_model, &child_schema, &outcome.values)
					.await
				{
					Ok(_) => {}
					Err(AdminError::Database(e)) => {
						error_map.entry(child_key.clone()).or_default().push(
							FieldError::for_item(
								child_schema.primary_key_field.clone(),
								format!("Could not save: {}", e),
								new_item.idx.to_string(),
							),
						);
					}
					Err(other) => return Err(other),
				}
			}
		}

		if error_map.is_empty() {
			tracing::debug!(model = model_key, parent = parent_id, "saved inline batch");
			Ok(PostResult::success("Saved", serde_json::Value::Null))
		} else {
			Ok(PostResult::nested_errors(
				"Some items could not be saved",
				error_map,
			))
		}
	}

	fn id_as_string(id: &serde_json::Value) -> String {
		match id {
			serde_json::Value::String(s) => s.clone(),
			other => other.to_string(),
		}
	}

	fn parent_fk_json(parent_schema: &ModelSchema, parent_id: &str) -> serde_json::Value {
		match Self::pk_sea_value(parent_schema, parent_id) {
			sea_query::Value::BigInt(Some(i)) => serde_json::Value::from(i),
			_ => serde_json::Value::from(parent_id),
		}
	}

	/// Hard delete by primary key. Deleting an already-deleted id is an
	/// error, not a silent success.
	pub async fn delete_item(&self, model_key: &str, id: &str) -> AdminResult<PostResult> {
		let (definition, schema) = self.resolve(model_key)?;
		let stmt = Query::delete()
			.from_table(Alias::new(definition.storage_model.as_str()))
			.and_where(
				Expr::col(Alias::new(schema.primary_key_field.as_str()))
					.eq(Self::pk_sea_value(&schema, id)),
			)
			.to_owned();
		let affected = self.executor.execute(&self.render(&stmt)).await?;
		if affected == 0 {
			return Err(AdminError::ItemNotFound {
				model: model_key.to_string(),
				id: id.to_string(),
			});
		}
		tracing::debug!(model = model_key, id, "deleted item");
		Ok(PostResult::success("Deleted", serde_json::Value::Null))
	}

	async fn resolve_selector(
		&self,
		definition: &ModelDefinition,
		schema: &ModelSchema,
		selector: &IdSelector,
	) -> AdminResult<Vec<String>> {
		match selector {
			IdSelector::Ids(ids) => Ok(ids.clone()),
			IdSelector::All {
				filters,
				search_term,
			} => {
				let mut condition = Condition::all().add(filter_condition(schema, filters));
				if let Some(term) = search_term {
					if let Some(search) =
						search_condition(schema, &definition.search_fields, term)
					{
						condition = condition.add(search);
					}
				}
				let stmt = Query::select()
					.column(Alias::new(schema.primary_key_field.as_str()))
					.from(Alias::new(definition.storage_model.as_str()))
					.cond_where(condition)
					.to_owned();
				let rows = self.executor.fetch_all(&self.render(&stmt)).await?;
				Ok(rows
					.into_iter()
					.filter_map(|row| {
						row.get(&schema.primary_key_field).map(Self::id_as_string)
					})
					.collect())
			}
		}
	}

	/// Dispatch a bulk action over the selected ids. Per-item failures are
	/// collected and reported alongside the count of applied items.
	pub async fn perform_action(
		&self,
		model_key: &str,
		actor: &str,
		action_key: &str,
		selector: &IdSelector,
	) -> AdminResult<PostResult> {
		let (definition, schema) = self.resolve(model_key)?;
		let action = definition
			.action_def(action_key)
			.ok_or_else(|| AdminError::UnknownAction {
				model: model_key.to_string(),
				action: action_key.to_string(),
			})?
			.clone();

		let ids = self.resolve_selector(definition, &schema, selector).await?;
		let selected = ids.len() as u64;
		tracing::debug!(
			model = model_key,
			action = action_key,
			actor,
			selected,
			"dispatching bulk action"
		);

		let outcome = if action_key == DELETE_SELECTED {
			self.delete_selected(definition, &schema, &ids).await?
		} else {
			let handler = definition.action_handlers.get(action_key).ok_or_else(|| {
				AdminError::UnknownAction {
					model: model_key.to_string(),
					action: action_key.to_string(),
				}
			})?;
			handler.handle(actor, &ids).await?
		};

		if outcome.errors.is_empty() {
			Ok(PostResult::success(
				format!("{}: {} items affected", action.label, outcome.affected),
				serde_json::json!({ "affected": outcome.affected }),
			))
		} else {
			Ok(PostResult::Error {
				message: format!(
					"{}: {} of {} selected items affected",
					action.label, outcome.affected, selected
				),
				detail: crate::types::ErrorDetail::Fields(outcome.errors),
			})
		}
	}

	// One DELETE per id so misses stay attributable.
	async fn delete_selected(
		&self,
		definition: &ModelDefinition,
		schema: &ModelSchema,
		ids: &[String],
	) -> AdminResult<ActionOutcome> {
		let mut outcome = ActionOutcome::default();
		for id in ids {
			let stmt = Query::delete()
				.from_table(Alias::new(definition.storage_model.as_str()))
				.and_where(
					Expr::col(Alias::new(schema.primary_key_field.as_str()))
						.eq(Self::pk_sea_value(schema, id)),
				)
				.to_owned();
			let affected = self.executor.execute(&self.render(&stmt)).await?;
			if affected == 0 {
				outcome.errors.push(FieldError::for_item(
					schema.primary_key_field.clone(),
					"Item not found",
					id.clone(),
				));
			} else {
				outcome.affected += affected;
			}
		}
		Ok(outcome)
	}

	/// Search-as-you-type candidates for a foreign-key field. An empty
	/// query with no dependent constraints returns nothing rather than the
	/// whole target table.
	pub async fn autocomplete(
		&self,
		model_key: &str,
		target_model_key: &str,
		key_field: &str,
		search: &str,
		dep_data: &BTreeMap<String, serde_json::Value>,
	) -> AdminResult<Vec<Choice>> {
		// the source model must at least be registered
		self.registry.resolve(model_key)?;
		let (target_def, target_schema) = self.resolve(target_model_key)?;

		let search = search.trim();
		if search.is_empty() && dep_data.is_empty() {
			return Ok(Vec::new());
		}

		let label_column = target_def
			.list_display_fields
			.iter()
			.find(|f| *f != PK_FIELD && f.as_str() != key_field)
			.cloned()
			.unwrap_or_else(|| key_field.to_string());

		let mut condition = Condition::all();
		if !search.is_empty() {
			condition = condition.add(
				sea_query::Func::lower(Expr::col(Alias::new(label_column.as_str())))
					.like(format!("%{}%", search.to_lowercase())),
			);
		}
		for (column, value) in dep_data {
			if target_schema.fields.iter().any(|f| f.column_name == *column) {
				condition = condition
					.add(Expr::col(Alias::new(column.as_str())).eq(json_to_sea_value(value)));
			}
		}

		let stmt = Query::select()
			.column(Alias::new(key_field))
			.column(Alias::new(label_column.as_str()))
			.from(Alias::new(target_def.storage_model.as_str()))
			.cond_where(condition)
			.order_by(Alias::new(label_column.as_str()), Order::Asc)
			.limit(AUTOCOMPLETE_LIMIT)
			.to_owned();
		let rows = self.executor.fetch_all(&self.render(&stmt)).await?;
		Ok(rows
			.into_iter()
			.map(|row| {
				let value = row.get(key_field).cloned().unwrap_or(serde_json::Value::Null);
				let label = row
					.get(&label_column)
					.and_then(|v| v.as_str().map(str::to_string))
					.unwrap_or_else(|| Self::id_as_string(&value));
				Choice { value, label }
			})
			.collect())
	}

	/// Map a non-primary unique field value to the canonical primary key.
	pub async fn resolve_id_by_unique_field(
		&self,
		model_key: &str,
		field: &str,
		value: &str,
	) -> AdminResult<serde_json::Value> {
		let (definition, schema) = self.resolve(model_key)?;
		if !schema.fields.iter().any(|f| f.column_name == field) {
			return Err(AdminError::NotFound {
				model: model_key.to_string(),
				field: field.to_string(),
				value: value.to_string(),
			});
		}
		let stmt = Query::select()
			.column(Alias::new(schema.primary_key_field.as_str()))
			.from(Alias::new(definition.storage_model.as_str()))
			.and_where(Expr::col(Alias::new(field)).eq(value))
			.to_owned();
		let row = self.executor.fetch_optional(&self.render(&stmt)).await?;
		row.and_then(|r| r.get(&schema.primary_key_field).cloned())
			.ok_or_else(|| AdminError::NotFound {
				model: model_key.to_string(),
				field: field.to_string(),
				value: value.to_string(),
			})
	}
}
