//! Pattern-based request routing.
//!
//! A [`Router`] holds three kinds of registrations:
//!
//! - routes, keyed by pattern string and matched in insertion order
//! - prefix filters, run for every request whose path starts with the prefix
//! - parameter filters, run when a matched route supplies the named parameter
//!
//! Registration happens before serving starts. After that the router is
//! read-only and can be shared behind an `Arc` without locking.

mod dispatch;
mod handler;
mod pattern;
mod route;
mod tests;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use log::debug;

use crate::parser::{HttpRequest, Method};
use crate::server::{static_files, Error, ResponseWriter};

pub use handler::{handler_fn, HandlerFn, HandlerFuture};
pub use pattern::{has_param_marker, CompiledPattern, DEFAULT_CAPTURE, PARAM_MARKER};
pub use route::{MethodHandler, Route, RouteTable};

/// Filters registered under one path prefix.
#[derive(Clone)]
pub(crate) struct PrefixFilters {
    pub(crate) prefix: String,
    pub(crate) filters: Vec<HandlerFn>,
}

/// A filter that only runs when a parameter is present.
#[derive(Clone)]
pub(crate) struct ParamFilter {
    pub(crate) param: String,
    pub(crate) filter: HandlerFn,
}

/// The route table plus prefix and parameter filters.
#[derive(Clone, Default)]
pub struct Router {
    routes: RouteTable,
    prefix_filters: Vec<PrefixFilters>,
    param_filters: Vec<ParamFilter>,
}

impl Router {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// The route table, in match order.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Register a handler for any method.
    pub fn handle<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.routes.register(None, pattern, handler_fn(handler), false)?;
        Ok(self)
    }

    /// Register a handler for one method.
    pub fn route<F, Fut>(&mut self, method: Method, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.routes.register(Some(method), pattern, handler_fn(handler), false)?;
        Ok(self)
    }

    /// Register a handler for GET requests.
    pub fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    /// Register a handler for POST requests.
    pub fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    /// Register a handler for PUT requests.
    pub fn put<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    /// Register a handler for DELETE requests.
    pub fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Register a handler for PATCH requests.
    pub fn patch<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Register a filter.
    ///
    /// A pattern with a parameter segment attaches the filter to that
    /// pattern's route. Any other pattern is treated as a path prefix.
    pub fn filter<F, Fut>(&mut self, pattern: &str, filter: F) -> Result<&mut Self, Error>
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let filter = handler_fn(filter);
        if has_param_marker(pattern) {
            self.routes.register(None, pattern, filter, true)?;
            return Ok(self);
        }

        match self.prefix_filters.iter_mut().find(|g| g.prefix == pattern) {
            Some(group) => group.filters.push(filter),
            None => self.prefix_filters.push(PrefixFilters {
                prefix: pattern.to_string(),
                filters: vec![filter],
            }),
        }
        debug!("Registered prefix filter on {pattern}");
        Ok(self)
    }

    /// Register a filter for every request.
    pub fn use_filter<F, Fut>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let filter = handler_fn(filter);
        match self.prefix_filters.iter_mut().find(|g| g.prefix == "/") {
            Some(group) => group.filters.push(filter),
            None => self.prefix_filters.push(PrefixFilters {
                prefix: "/".to_string(),
                filters: vec![filter],
            }),
        }
        self
    }

    /// Register a filter that runs when a matched route supplies `param`.
    ///
    /// A leading `:` on the name is ignored. The filter runs at most once
    /// per request, after the parameter has been extracted and before the
    /// route's own filters.
    pub fn use_param<F, Fut>(&mut self, param: &str, filter: F) -> &mut Self
    where
        F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let param = param.strip_prefix(PARAM_MARKER).unwrap_or(param);
        self.param_filters.push(ParamFilter {
            param: param.to_string(),
            filter: handler_fn(filter),
        });
        self
    }

    /// Serve files from `dir` for GET and HEAD requests under `prefix`.
    ///
    /// The remainder of the request path after the prefix names the file.
    /// It is cleaned before use, so it can never leave `dir`.
    pub fn static_files(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> Result<&mut Self, Error> {
        let mut prefix = prefix.to_string();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        let pattern = format!("{prefix}{PARAM_MARKER}filepath(.*)");
        let root: Arc<PathBuf> = Arc::new(dir.into());
        let mount = Arc::new(prefix.trim_end_matches('/').to_string());

        let serve = handler_fn(move |req: Arc<HttpRequest>, w: ResponseWriter| {
            let root = Arc::clone(&root);
            let mount = Arc::clone(&mount);
            async move {
                let file = req.path.strip_prefix(mount.as_str()).unwrap_or(&req.path);
                static_files::serve_file(&root, file, &w).await
            }
        });
        self.routes.register(Some(Method::GET), &pattern, Arc::clone(&serve), false)?;
        self.routes.register(Some(Method::HEAD), &pattern, serve, false)?;
        Ok(self)
    }
}
