//! HTTP surface
//!
//! A thin hyper HTTP/1 service translating requests into engine calls and
//! engine results into JSON responses. Validation failures are normal 200
//! responses carrying a `PostResult` error body; configuration and
//! not-found failures map to 4xx; executor failures map to 500 with the
//! database detail kept out of the response.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use simpleblog_admin::{AdminEngine, AdminError, IdSelector, InlineSaveBatch, ListQuery};
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Outcome of routing one request.
#[derive(Debug)]
pub struct ApiResponse {
	pub status: StatusCode,
	pub body: serde_json::Value,
}

impl ApiResponse {
	fn ok(body: serde_json::Value) -> Self {
		Self {
			status: StatusCode::OK,
			body,
		}
	}

	fn error(status: StatusCode, message: impl Into<String>) -> Self {
		Self {
			status,
			body: serde_json::json!({
				"status": "error",
				"message": message.into(),
			}),
		}
	}
}

/// HTTP status for an engine error.
pub fn status_for(err: &AdminError) -> StatusCode {
	match err {
		AdminError::UnknownModel(_)
		| AdminError::SchemaNotFound(_)
		| AdminError::ItemNotFound { .. }
		| AdminError::NotFound { .. } => StatusCode::NOT_FOUND,
		AdminError::UnknownAction { .. } | AdminError::InvalidDefinition { .. } => {
			StatusCode::BAD_REQUEST
		}
		AdminError::QueryBuild(_) | AdminError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

fn engine_error(err: AdminError) -> ApiResponse {
	let status = status_for(&err);
	if status == StatusCode::INTERNAL_SERVER_ERROR {
		tracing::error!(error = %err, "admin operation failed");
		ApiResponse::error(status, "Internal server error")
	} else {
		ApiResponse::error(status, err.to_string())
	}
}

/// Parse the list query conventions: `p` is the zero-based page, `_q` the
/// search term, `_o` the signed ordering index, everything else a filter.
pub fn parse_list_query(raw_query: &str) -> ListQuery {
	let pairs: Vec<(String, String)> =
		serde_urlencoded::from_str(raw_query).unwrap_or_default();
	let mut list = ListQuery::default();
	for (key, value) in pairs {
		match key.as_str() {
			"p" => list.page = value.parse().unwrap_or(0),
			"_q" => {
				if !value.trim().is_empty() {
					list.search_term = Some(value);
				}
			}
			"_o" => list.ordering = value.parse().ok(),
			_ => {
				list.filters.insert(key, serde_json::Value::String(value));
			}
		}
	}
	list
}

fn query_param(raw_query: &str, name: &str) -> Option<String> {
	let pairs: Vec<(String, String)> =
		serde_urlencoded::from_str(raw_query).unwrap_or_default();
	pairs.into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

fn json_body(body: &[u8]) -> Result<serde_json::Value, ApiResponse> {
	if body.is_empty() {
		return Ok(serde_json::Value::Null);
	}
	serde_json::from_slice(body)
		.map_err(|e| ApiResponse::error(StatusCode::BAD_REQUEST, format!("invalid JSON body: {e}")))
}

fn object_body(body: &[u8]) -> Result<serde_json::Map<String, serde_json::Value>, ApiResponse> {
	match json_body(body)? {
		serde_json::Value::Object(map) => Ok(map),
		_ => Err(ApiResponse::error(
			StatusCode::BAD_REQUEST,
			"expected a JSON object body",
		)),
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionPayload {
	#[serde(default)]
	ids: Option<Vec<serde_json::Value>>,
	#[serde(default)]
	select_all: bool,
	#[serde(default)]
	filters: BTreeMap<String, serde_json::Value>,
	#[serde(default)]
	q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutocompletePayload {
	target_model: String,
	key_field: String,
	#[serde(default)]
	query: String,
	#[serde(default)]
	dep_data: BTreeMap<String, serde_json::Value>,
}

fn id_string(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

macro_rules! respond {
	($result:expr) => {
		match $result {
			Ok(value) => match serde_json::to_value(&value) {
				Ok(body) => ApiResponse::ok(body),
				Err(e) => ApiResponse::error(
					StatusCode::INTERNAL_SERVER_ERROR,
					format!("serialization failed: {e}"),
				),
			},
			Err(err) => engine_error(err),
		}
	};
}

/// Route one request to the engine. Kept free of hyper types so the route
/// table is testable without a socket.
pub async fn dispatch(
	engine: &AdminEngine,
	method: &Method,
	path: &str,
	raw_query: &str,
	actor: &str,
	body: &[u8],
) -> ApiResponse {
	let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

	match (method, segments.as_slice()) {
		(&Method::GET, ["admin", "models"]) => {
			respond!(Ok::<_, AdminError>(engine.list_models()))
		}
		(&Method::GET, ["admin", "models", model]) => {
			respond!(engine.item_metadata(model).await)
		}
		(&Method::GET, ["admin", "items", model]) => {
			let list = parse_list_query(raw_query);
			respond!(engine.list_items(model, &list).await)
		}
		(&Method::GET, ["admin", "items", model, id]) => {
			respond!(engine.get_item(model, id).await)
		}
		(&Method::POST, ["admin", "items", model]) => {
			let data = match object_body(body) {
				Ok(data) => data,
				Err(response) => return response,
			};
			respond!(engine.create_item(model, &data).await)
		}
		(&Method::PUT, ["admin", "items", model, id]) => {
			let data = match object_body(body) {
				Ok(data) => data,
				Err(response) => return response,
			};
			respond!(engine.update_item(model, id, &data).await)
		}
		(&Method::DELETE, ["admin", "items", model, id]) => {
			respond!(engine.delete_item(model, id).await)
		}
		// legacy form-post delete route kept for older clients
		(&Method::POST, ["admin", "items", model, id, "delete"]) => {
			respond!(engine.delete_item(model, id).await)
		}
		(&Method::POST, ["admin", "items", model, "actions", action]) => {
			let payload: ActionPayload = match json_body(body) {
				Ok(serde_json::Value::Null) => ActionPayload::default(),
				Ok(value) => match serde_json::from_value(value) {
					Ok(payload) => payload,
					Err(e) => {
						return ApiResponse::error(
							StatusCode::BAD_REQUEST,
							format!("invalid action payload: {e}"),
						);
					}
				},
				Err(response) => return response,
			};
			let selector = match payload.ids {
				Some(ids) => IdSelector::Ids(ids.iter().map(id_string).collect()),
				None if payload.select_all => IdSelector::All {
					filters: payload.filters,
					search_term: payload.q,
				},
				None => {
					return ApiResponse::error(
						StatusCode::BAD_REQUEST,
						"action payload needs 'ids' or 'selectAll'",
					);
				}
			};
			respond!(engine.perform_action(model, actor, action, &selector).await)
		}
		(&Method::PUT, ["admin", "inlines", model, id]) => {
			let batch: InlineSaveBatch = match json_body(body) {
				Ok(value) => match serde_json::from_value(value) {
					Ok(batch) => batch,
					Err(e) => {
						return ApiResponse::error(
							StatusCode::BAD_REQUEST,
							format!("invalid inline batch: {e}"),
						);
					}
				},
				Err(response) => return response,
			};
			respond!(engine.save_inlines(model, id, &batch).await)
		}
		(&Method::POST, ["admin", "autocomplete", model]) => {
			let payload: AutocompletePayload = match json_body(body) {
				Ok(value) => match serde_json::from_value(value) {
					Ok(payload) => payload,
					Err(e) => {
						return ApiResponse::error(
							StatusCode::BAD_REQUEST,
							format!("invalid autocomplete payload: {e}"),
						);
					}
				},
				Err(response) => return response,
			};
			respond!(
				engine
					.autocomplete(
						model,
						&payload.target_model,
						&payload.key_field,
						&payload.query,
						&payload.dep_data,
					)
					.await
			)
		}
		(&Method::GET, ["admin", "get-id-by-unique", model]) => {
			let (Some(field), Some(value)) = (
				query_param(raw_query, "field"),
				query_param(raw_query, "value"),
			) else {
				return ApiResponse::error(
					StatusCode::BAD_REQUEST,
					"'field' and 'value' query parameters are required",
				);
			};
			match engine.resolve_id_by_unique_field(model, &field, &value).await {
				Ok(id) => ApiResponse::ok(serde_json::json!({ "id": id })),
				Err(err) => engine_error(err),
			}
		}
		_ => ApiResponse::error(StatusCode::NOT_FOUND, "Not found"),
	}
}

/// hyper service wrapping [`dispatch`].
#[derive(Clone)]
pub struct AdminService {
	engine: Arc<AdminEngine>,
}

impl Service<hyper::Request<Incoming>> for AdminService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = Box<dyn std::error::Error + Send + Sync>;
	type Future =
		Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let engine = Arc::clone(&self.engine);
		Box::pin(async move {
			let (parts, body) = req.into_parts();
			let bytes = body.collect().await?.to_bytes();
			let actor = parts
				.headers
				.get("x-admin-actor")
				.and_then(|v| v.to_str().ok())
				.unwrap_or("anonymous")
				.to_string();
			let raw_query = parts.uri.query().unwrap_or("");
			let response = dispatch(
				&engine,
				&parts.method,
				parts.uri.path(),
				raw_query,
				&actor,
				&bytes,
			)
			.await;
			let payload = serde_json::to_vec(&response.body)?;
			let http_response = hyper::Response::builder()
				.status(response.status)
				.header(CONTENT_TYPE, "application/json")
				.body(Full::new(Bytes::from(payload)))?;
			Ok(http_response)
		})
	}
}

/// HTTP/1 server around the admin engine.
pub struct HttpServer {
	engine: Arc<AdminEngine>,
}

impl HttpServer {
	pub fn new(engine: Arc<AdminEngine>) -> Self {
		Self { engine }
	}

	/// Bind and serve until an accept error occurs.
	pub async fn listen(self, addr: SocketAddr) -> anyhow::Result<()> {
		let listener = TcpListener::bind(addr).await?;
		tracing::info!(%addr, "admin server listening");

		loop {
			let (stream, remote) = listener.accept().await?;
			let service = AdminService {
				engine: Arc::clone(&self.engine),
			};
			tokio::task::spawn(async move {
				if let Err(err) = Self::handle_connection(stream, service).await {
					tracing::warn!(%remote, error = %err, "connection error");
				}
			});
		}
	}

	async fn handle_connection(
		stream: TcpStream,
		service: AdminService,
	) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
		let io = TokioIo::new(stream);
		http1::Builder::new().serve_connection(io, service).await?;
		Ok(())
	}
}
