//! Runtime settings, loaded from environment variables with sensible
//! defaults for local development.

use anyhow::Context;
use std::net::SocketAddr;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone)]
pub struct Settings {
	pub addr: SocketAddr,
	pub database_url: String,
	pub log: String,
}

impl Settings {
	pub fn from_env() -> anyhow::Result<Self> {
		let addr = std::env::var("SIMPLEBLOG_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
		let addr: SocketAddr = addr
			.parse()
			.with_context(|| format!("invalid SIMPLEBLOG_ADDR: {addr}"))?;
		let database_url = std::env::var("SIMPLEBLOG_DATABASE_URL")
			.unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
		let log = std::env::var("SIMPLEBLOG_LOG").unwrap_or_else(|_| DEFAULT_LOG.to_string());
		Ok(Self {
			addr,
			database_url,
			log,
		})
	}
}
