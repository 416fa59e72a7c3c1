//! HTTP server implementation for microroute-rs.
//!
//! This module provides the response model, the response state tracker that
//! filters and handlers write into, content negotiation and static file
//! helpers, and a small TCP server that feeds parsed requests to a router.

mod response;
mod config;
mod error;
mod http_server;
mod writer;
pub mod content;
pub mod static_files;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::HttpServer;
pub use writer::ResponseWriter;
