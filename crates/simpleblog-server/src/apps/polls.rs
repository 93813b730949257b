//! Poll models: a poll owns questions, a question owns options. The nested
//! inline editing of this chain is what exercises the inline save protocol
//! and dependent autocomplete.

use simpleblog_admin::{
	delete_selected_action, ColumnMeta, InlineDefinition, ModelDefinition, NativeType,
	TableSchema,
};

pub fn tables() -> Vec<TableSchema> {
	vec![
		TableSchema::new("polls", "id")
			.column(ColumnMeta::new("id", NativeType::Integer))
			.column(ColumnMeta::new("title", NativeType::VarChar(255)))
			.column(ColumnMeta::new("starts_at", NativeType::TimestampTz).nullable())
			.column(ColumnMeta::new("ends_at", NativeType::TimestampTz).nullable()),
		TableSchema::new("poll_questions", "id")
			.column(ColumnMeta::new("id", NativeType::Integer))
			.column(ColumnMeta::new("poll_id", NativeType::Integer))
			.column(ColumnMeta::new("text", NativeType::VarChar(255)))
			.column(ColumnMeta::new("position", NativeType::Integer).default_expr("0"))
			.relation("poll_id", "polls", "id", false),
		TableSchema::new("poll_options", "id")
			.column(ColumnMeta::new("id", NativeType::Integer))
			.column(ColumnMeta::new("question_id", NativeType::Integer))
			.column(ColumnMeta::new("text", NativeType::VarChar(255)))
			.column(ColumnMeta::new("votes", NativeType::Integer).default_expr("0"))
			.relation("question_id", "poll_questions", "id", false),
	]
}

pub fn definitions() -> Vec<(String, ModelDefinition)> {
	vec![
		(
			"poll".to_string(),
			ModelDefinition::builder("polls", "Polls")
				.list_display_fields(&["id", "title", "starts_at", "ends_at"])
				.search_fields(&["title"])
				.inline(
					InlineDefinition::new("pollQuestion", "Questions", "poll_id")
						.expanded()
						.fields(&["text", "position"])
						.max_items(20),
				)
				.action(delete_selected_action())
				.build(),
		),
		(
			"pollQuestion".to_string(),
			ModelDefinition::builder("poll_questions", "Poll questions")
				.list_display_fields(&["id", "text", "position"])
				.search_fields(&["text"])
				.inline(
					InlineDefinition::new("pollOption", "Options", "question_id")
						.fields(&["text"])
						.layout("table"),
				)
				.action(delete_selected_action())
				.build(),
		),
		(
			"pollOption".to_string(),
			ModelDefinition::builder("poll_options", "Poll options")
				.list_display_fields(&["id", "text", "votes"])
				.search_fields(&["text"])
				.readonly_fields(&["votes"])
				.build(),
		),
	]
}
