//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Parsed Request (method, path)
//!     → strip base path length
//!     → router.rs (scan RouteTable in declaration order)
//!     → first exact (method, path) match
//!     → filter (optional) may substitute the handler
//!     → Return: handler, or NoMatch → 404 with empty body
//!
//! Route Table (at startup):
//!     Vec<Route> in declaration order
//!     → frozen behind Arc, never mutated
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - Exact path comparison, no patterns
//! - Deterministic: same input always matches same route
//! - First match wins; later duplicates are unreachable but legal

pub mod route;
pub mod router;

pub use route::{Filter, Handler, Route, RouteTable};
pub use router::Router;
