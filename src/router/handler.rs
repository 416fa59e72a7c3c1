//! Handler and filter function types.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::HttpRequest;
use crate::server::{Error, ResponseWriter};

/// Type alias for a boxed future that returns a Result<(), Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

/// Type alias for a handler or filter.
///
/// Both receive the request and the shared response writer. A filter stops
/// the chain by writing to the response; otherwise the next one runs.
pub type HandlerFn = Arc<dyn Fn(Arc<HttpRequest>, ResponseWriter) -> HandlerFuture + Send + Sync>;

/// Box an async closure into a [`HandlerFn`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Arc<HttpRequest>, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    Arc::new(move |req: Arc<HttpRequest>, w: ResponseWriter| -> HandlerFuture {
        Box::pin(f(req, w))
    })
}
