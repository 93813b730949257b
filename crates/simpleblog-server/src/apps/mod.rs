//! Application wiring: schema declarations and admin definitions for the
//! blog and poll models.

pub mod blog;
pub mod polls;

use simpleblog_admin::{AdminRegistry, AdminResult, SchemaCatalog};

/// The full schema catalog for the deployment.
pub fn schema_catalog() -> SchemaCatalog {
	let mut builder = SchemaCatalog::builder();
	for table in blog::tables() {
		builder = builder.table(table);
	}
	for table in polls::tables() {
		builder = builder.table(table);
	}
	builder.build()
}

/// Every registered admin model, validated against the catalog.
pub fn admin_registry(catalog: &SchemaCatalog) -> AdminResult<AdminRegistry> {
	let mut builder = AdminRegistry::builder();
	for (key, definition) in blog::definitions() {
		builder = builder.register(key, definition);
	}
	for (key, definition) in polls::definitions() {
		builder = builder.register(key, definition);
	}
	builder.build(catalog)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_registry_builds_against_catalog() {
		let catalog = schema_catalog();
		let registry = admin_registry(&catalog).unwrap();
		let models = registry.list_models();
		for key in ["user", "category", "post", "poll", "pollQuestion", "pollOption"] {
			assert!(models.contains_key(key), "missing model {key}");
		}
	}
}
