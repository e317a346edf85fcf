//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Strip the base path from the request path
//! - Look up the first route matching method and path
//! - Let the route's filter substitute the handler
//! - Answer unmatched requests with 404 and no body
//!
//! # Design Decisions
//! - Immutable after construction (shared across workers without locks)
//! - O(n) ordered scan (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default

use crate::context::Context;
use crate::protocol::{Request, Response, StatusCode};
use crate::routing::{Handler, RouteTable};

/// Matches requests against a [`RouteTable`] mounted under a base path.
#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
    /// Bytes stripped from every request path before comparison.
    base_len: usize,
}

impl Router {
    pub fn new(table: RouteTable, base_path: &str) -> Self {
        Self {
            table,
            base_len: base_path.len(),
        }
    }

    pub fn base_len(&self) -> usize {
        self.base_len
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Select the handler for `req`, consulting the matched route's filter.
    ///
    /// A path shorter than the base path matches nothing.
    pub fn select(&self, ctx: &Context, req: &Request) -> Option<Handler> {
        let path = req.route().get(self.base_len..)?;
        let route = self
            .table
            .iter()
            .find(|route| route.matches(req.method(), path))?;

        if let Some(filter) = route.filter {
            if let Some(substitute) = filter(ctx, req) {
                tracing::debug!(method = %req.method(), path, "Filter substituted handler");
                return Some(substitute);
            }
        }
        Some(route.handler)
    }

    /// Run the selected handler, or mark the response 404.
    ///
    /// Returns whether a handler ran.
    pub fn dispatch(&self, ctx: &Context, req: &Request, resp: &mut Response) -> bool {
        match self.select(ctx, req) {
            Some(handler) => {
                handler(ctx, req, resp);
                true
            }
            None => {
                tracing::warn!(method = %req.method(), route = req.route(), "No route matched");
                resp.set_status(StatusCode::NOT_FOUND);
                false
            }
        }
    }
}
