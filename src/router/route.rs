//! Compiled routes and the route table.

use log::debug;

use crate::parser::Method;
use crate::router::handler::HandlerFn;
use crate::router::pattern::CompiledPattern;
use crate::server::Error;

/// A handler bound to one method, or to any method when `method` is `None`.
#[derive(Clone)]
pub struct MethodHandler {
    /// The method this handler answers, `None` for all methods.
    pub method: Option<Method>,
    /// The handler function.
    pub handler: HandlerFn,
}

/// A compiled pattern with its filters and handlers.
#[derive(Clone)]
pub struct Route {
    pattern: CompiledPattern,
    handlers: Vec<MethodHandler>,
    filters: Vec<HandlerFn>,
}

impl Route {
    fn new(pattern: CompiledPattern) -> Self {
        Self {
            pattern,
            handlers: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// Filters scoped to this pattern, in registration order.
    pub fn filters(&self) -> &[HandlerFn] {
        &self.filters
    }

    /// Registered handlers.
    pub fn handlers(&self) -> &[MethodHandler] {
        &self.handlers
    }

    /// Methods with a dedicated handler. Empty if only "any" handlers exist.
    pub fn methods(&self) -> Vec<Method> {
        self.handlers.iter().filter_map(|h| h.method).collect()
    }

    /// The handler for `method`, preferring an exact match over "any".
    pub fn handler_for(&self, method: Method) -> Option<&HandlerFn> {
        self.handlers
            .iter()
            .find(|h| h.method == Some(method))
            .or_else(|| self.handlers.iter().find(|h| h.method.is_none()))
            .map(|h| &h.handler)
    }

    fn set_handler(&mut self, method: Option<Method>, handler: HandlerFn) {
        match self.handlers.iter_mut().find(|h| h.method == method) {
            Some(slot) => slot.handler = handler,
            None => self.handlers.push(MethodHandler { method, handler }),
        }
    }
}

/// Insertion-ordered routes. Order is also match priority.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler or filter for a pattern.
    ///
    /// A pattern string already in the table is reused: a filter is
    /// appended to its filters, a handler replaces the one for the same
    /// method. Otherwise the pattern is compiled and a new route appended.
    pub fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        handler: HandlerFn,
        is_filter: bool,
    ) -> Result<(), Error> {
        let index = match self.routes.iter().position(|r| r.pattern.as_str() == pattern) {
            Some(index) => index,
            None => {
                let compiled = CompiledPattern::new(pattern)?;
                self.routes.push(Route::new(compiled));
                self.routes.len() - 1
            }
        };

        let route = &mut self.routes[index];
        if is_filter {
            route.filters.push(handler);
            debug!("Registered filter #{} on {pattern}", route.filters.len());
        } else {
            route.set_handler(method, handler);
            match method {
                Some(method) => debug!("Registered handler {method} {pattern}"),
                None => debug!("Registered handler ANY {pattern}"),
            }
        }
        Ok(())
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate over routes in match order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}
