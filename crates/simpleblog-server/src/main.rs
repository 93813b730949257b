use simpleblog_admin::AdminEngine;
use simpleblog_db::{PgExecutor, QueryExecutor, SqliteExecutor};
use simpleblog_server::{apps, HttpServer, Settings};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let settings = Settings::from_env()?;

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(settings.log.clone())),
		)
		.init();

	let executor: Arc<dyn QueryExecutor> = if settings.database_url.starts_with("postgres") {
		Arc::new(PgExecutor::connect(&settings.database_url).await?)
	} else {
		Arc::new(SqliteExecutor::connect(&settings.database_url).await?)
	};

	let catalog = Arc::new(apps::schema_catalog());
	let registry = Arc::new(apps::admin_registry(&catalog)?);
	let engine = Arc::new(AdminEngine::new(registry, catalog, executor));

	tracing::info!(
		models = engine.list_models().len(),
		"admin registry initialized"
	);

	HttpServer::new(engine).listen(settings.addr).await
}
