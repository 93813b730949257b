//! simpleblog admin server
//!
//! Wires the generic admin engine to the blog and poll models and exposes
//! it over HTTP/1.

pub mod apps;
pub mod http;
pub mod settings;

pub use http::{dispatch, AdminService, HttpServer};
pub use settings::Settings;
