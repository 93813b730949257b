//! Blog models: users, categories, posts.

use simpleblog_admin::{
	delete_selected_action, ColorValidator, ColumnMeta, EmailValidator, ModelDefinition,
	NativeType, SlugValidator, TableSchema,
};
use std::sync::Arc;

pub fn tables() -> Vec<TableSchema> {
	vec![
		TableSchema::new("users", "id")
			.column(ColumnMeta::new("id", NativeType::Integer))
			.column(ColumnMeta::new("email", NativeType::VarChar(255)))
			.column(ColumnMeta::new("first_name", NativeType::VarChar(100)).nullable())
			.column(ColumnMeta::new("last_name", NativeType::VarChar(100)))
			.column(ColumnMeta::new("is_active", NativeType::Boolean).default_expr("true"))
			.column(ColumnMeta::new("created_at", NativeType::TimestampTz).default_expr("now()")),
		TableSchema::new("categories", "id")
			.column(ColumnMeta::new("id", NativeType::Integer))
			.column(ColumnMeta::new("name", NativeType::VarChar(100)))
			.column(ColumnMeta::new("slug", NativeType::VarChar(100)))
			.column(ColumnMeta::new("color", NativeType::VarChar(7)).default_expr("'#888888'")),
		TableSchema::new("posts", "id")
			.column(ColumnMeta::new("id", NativeType::Integer))
			.column(ColumnMeta::new("title", NativeType::VarChar(255)))
			.column(ColumnMeta::new("slug", NativeType::VarChar(255)))
			.column(ColumnMeta::new("content", NativeType::Text).nullable())
			.column(
				ColumnMeta::new(
					"status",
					NativeType::Enum(
						"post_status".to_string(),
						vec!["draft".to_string(), "published".to_string()],
					),
				)
				.default_expr("'draft'::post_status"),
			)
			.column(ColumnMeta::new("published_at", NativeType::TimestampTz).nullable())
			.column(ColumnMeta::new("author_id", NativeType::Integer))
			.column(ColumnMeta::new("category_id", NativeType::Integer).nullable())
			.column(ColumnMeta::new("tags", NativeType::Array("text".to_string())).nullable())
			.relation("author_id", "users", "id", false)
			.relation("category_id", "categories", "id", true),
	]
}

pub fn definitions() -> Vec<(String, ModelDefinition)> {
	vec![
		(
			"user".to_string(),
			ModelDefinition::builder("users", "Users")
				.list_display_fields(&["id", "email", "first_name", "last_name", "is_active"])
				.search_fields(&["#id", "first_name", "last_name", "email"])
				.list_filter_fields(&["is_active", "created_at"])
				.readonly_fields(&["created_at"])
				.validator("email", Arc::new(EmailValidator))
				.action(delete_selected_action())
				.build(),
		),
		(
			"category".to_string(),
			ModelDefinition::builder("categories", "Categories")
				.list_display_fields(&["id", "name", "slug", "color"])
				.search_fields(&["name", "slug"])
				.validator("slug", Arc::new(SlugValidator))
				.validator("color", Arc::new(ColorValidator))
				.action(delete_selected_action())
				.build(),
		),
		(
			"post".to_string(),
			ModelDefinition::builder("posts", "Posts")
				.list_display_fields(&["id", "title", "status", "published_at"])
				.search_fields(&["#id", "title", "slug"])
				.list_filter_fields(&["status", "published_at", "category_id"])
				.field_label("published_at", "Published")
				.field_widget("content", "markdown")
				.validator("slug", Arc::new(SlugValidator))
				.action(delete_selected_action())
				.build(),
		),
	]
}
