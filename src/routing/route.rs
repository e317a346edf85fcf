//! Route entries and the ordered table they live in.

use crate::context::Context;
use crate::protocol::{Method, Request, Response};

/// Produces the response for a matched request.
pub type Handler = fn(&Context, &Request, &mut Response);

/// Runs before a route's handler; returning a handler replaces it for this request.
pub type Filter = fn(&Context, &Request) -> Option<Handler>;

/// One (method, path, handler, filter) entry.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    /// Exact path, relative to the configured base path.
    pub path: String,
    pub handler: Handler,
    pub filter: Option<Filter>,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>, handler: Handler) -> Self {
        Self {
            method,
            path: path.into(),
            handler,
            filter: None,
        }
    }

    pub fn get(path: impl Into<String>, handler: Handler) -> Self {
        Self::new(Method::Get, path, handler)
    }

    pub fn post(path: impl Into<String>, handler: Handler) -> Self {
        Self::new(Method::Post, path, handler)
    }

    /// Guard this route with `filter`.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method && self.path == path
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Routes in declaration order. Order is the only tie-break.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. A duplicate (method, path) is accepted but shadowed by the earlier one.
    pub fn route(mut self, route: Route) -> Self {
        if self.routes.iter().any(|r| r.matches(&route.method, &route.path)) {
            tracing::warn!(
                method = %route.method,
                path = %route.path,
                "Duplicate route is unreachable"
            );
        }
        self.routes.push(route);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }
}

impl FromIterator<Route> for RouteTable {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        iter.into_iter().fold(RouteTable::new(), RouteTable::route)
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}
