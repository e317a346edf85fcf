//! SCGI gateway library.
//!
//! A front-end web server forwards requests over SCGI; each accepted
//! connection is served by one isolated worker that routes the request to a
//! handler and writes a CGI-style response.

// Core subsystems
pub mod dispatcher;
pub mod net;
pub mod protocol;
pub mod routing;
pub mod server;
pub mod worker;

// Cross-cutting concerns
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use context::Context;
pub use error::{Error, Result};
pub use protocol::{Method, Request, Response, StatusCode};
pub use routing::{Route, RouteTable, Router};
pub use server::{Server, ServerError};
