//! A minimal pattern-based HTTP router.
//!
//! This library routes parsed HTTP requests to async handlers by Express-style
//! path patterns, runs filters before handlers, and stops the chain as soon as
//! anything writes to the response.
//!
//! # Features
//!
//! - Path patterns with named parameters: `/user/:id`
//! - Custom capture expressions: `/user/:id([0-9]+)`
//! - Path parameters merged into the query parameters, read through one accessor
//! - Prefix filters, pattern filters and parameter filters
//! - Short-circuit: the first filter that writes a response ends dispatch
//! - Static file serving with path traversal protection
//! - JSON/XML content negotiation helpers
//! - A simple async HTTP/1.x server to run a router on
//!
//! # Examples
//!
//! ## Routing
//!
//! ```
//! use microroute_rs::{parse_request, Router, StatusCode};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut router = Router::new();
//! router
//!     .get("/user/:id([0-9]+)", |req, w| async move {
//!         let id = req.get_query_param("id").unwrap_or_default().to_string();
//!         w.write_str(&format!("user {id}"));
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let request = parse_request(b"GET /user/42 HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! let response = router.dispatch(request).await.unwrap();
//! assert_eq!(response.status, StatusCode::Ok);
//! assert_eq!(response.body, b"user 42");
//! # });
//! ```
//!
//! ## Filters
//!
//! ```
//! use microroute_rs::{parse_request, Router, StatusCode};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut router = Router::new();
//! router
//!     .filter("/", |req, w| async move {
//!         if !req.has_header("Authorization") {
//!             w.error(StatusCode::Unauthorized, "unauthorized");
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let request = parse_request(b"GET /ok HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! let response = router.dispatch(request).await.unwrap();
//! assert_eq!(response.status, StatusCode::Unauthorized);
//! # });
//! ```
//!
//! ## Error handling
//!
//! ```
//! use microroute_rs::{Router, ServerError};
//!
//! let mut router = Router::new();
//! let result = router.get("/user/:id([0-9+)", |_req, _w| async { Ok(()) });
//! assert!(matches!(result, Err(ServerError::InvalidPattern { .. })));
//! ```
//!
//! See the `demos` directory for complete servers.

// Export the parser module
pub mod parser;

// Export the router module
pub mod router;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, QueryParams, parse_request};
pub use router::{CompiledPattern, Router};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ResponseWriter, ServerConfig, StatusCode};
