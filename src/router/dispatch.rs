//! Request dispatch.
//!
//! For each request:
//!
//! 1. Prefix filters whose prefix starts the path run in registration order.
//! 2. Routes are scanned in insertion order. Every route whose pattern
//!    matches the whole path has its parameters appended to the request's
//!    query parameters (pairs an earlier route already added are skipped),
//!    then its filters run, then its handler.
//! 3. The first write to the response ends dispatch. So does running a
//!    handler, whether or not it wrote anything.
//! 4. If nothing responded: `404`. When a matching route only had handlers
//!    for other methods, an `Allow` header lists them.
//!
//! Errors from filters and handlers are returned as-is.

use std::sync::Arc;
use log::debug;

use crate::parser::{HttpRequest, Method};
use crate::router::handler::HandlerFn;
use crate::router::Router;
use crate::server::{Error, HttpResponse, ResponseWriter, StatusCode};

impl Router {
    /// Route a request and collect the response it produced.
    pub async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let w = ResponseWriter::new();
        self.dispatch_to(request, &w).await?;
        Ok(w.into_response())
    }

    /// Route a request, writing into an existing response writer.
    pub async fn dispatch_to(&self, request: HttpRequest, w: &ResponseWriter) -> Result<(), Error> {
        let mut request = Arc::new(request);

        for group in &self.prefix_filters {
            if !request.path.starts_with(&group.prefix) {
                continue;
            }
            if run_chain(&group.filters, &request, w).await? {
                debug!("Prefix filter on {} responded to {}", group.prefix, request.path);
                return Ok(());
            }
        }

        let mut allowed: Vec<Method> = Vec::new();
        let mut injected: Vec<(String, String)> = Vec::new();
        let mut param_filter_ran = vec![false; self.param_filters.len()];

        for route in self.routes.iter() {
            let Some(captures) = route.pattern().captures(&request.path) else {
                continue;
            };
            let params: Vec<(String, String)> = captures
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();

            let handler = route.handler_for(request.method).cloned();
            if handler.is_none() && route.filters().is_empty() {
                allowed.extend(route.methods());
                continue;
            }
            debug!("{} {} matched {}", request.method, request.path, route.pattern().as_str());

            // A pair already added by an earlier route is not added again
            let fresh: Vec<(String, String)> = params
                .into_iter()
                .filter(|pair| !injected.contains(pair))
                .collect();
            if !fresh.is_empty() {
                let req = Arc::make_mut(&mut request);
                for (name, value) in &fresh {
                    req.query_params.add(name.as_str(), value.as_str());
                }
                injected.extend(fresh);
            }

            for (i, param_filter) in self.param_filters.iter().enumerate() {
                if param_filter_ran[i] || !route.pattern().params().contains(&param_filter.param) {
                    continue;
                }
                param_filter_ran[i] = true;
                if run_chain(std::slice::from_ref(&param_filter.filter), &request, w).await? {
                    return Ok(());
                }
            }

            if run_chain(route.filters(), &request, w).await? {
                return Ok(());
            }

            match handler {
                Some(handler) => {
                    handler(Arc::clone(&request), w.clone()).await?;
                    return Ok(());
                }
                None => allowed.extend(route.methods()),
            }
        }

        if w.is_started() {
            return Ok(());
        }

        if !allowed.is_empty() {
            let mut unique: Vec<Method> = Vec::new();
            for method in allowed {
                if !unique.contains(&method) {
                    unique.push(method);
                }
            }
            let allow = unique
                .iter()
                .map(Method::as_str)
                .collect::<Vec<&str>>()
                .join(", ");
            debug!("No {} handler for {}, allowed: {allow}", request.method, request.path);
            w.set_header("Allow", allow);
        } else {
            debug!("No route for {} {}", request.method, request.path);
        }
        w.error(StatusCode::NotFound, "404 page not found");
        Ok(())
    }
}

/// Run filters in order until one writes to the response.
///
/// Returns `true` if the response was started.
async fn run_chain(filters: &[HandlerFn], request: &Arc<HttpRequest>, w: &ResponseWriter) -> Result<bool, Error> {
    for filter in filters {
        filter(Arc::clone(request), w.clone()).await?;
        if w.is_started() {
            return Ok(true);
        }
    }
    Ok(false)
}
