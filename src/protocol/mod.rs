//! SCGI protocol collaborator.
//!
//! # Data Flow
//! ```text
//! front-end web server
//!     → "<len>:NAME\0value\0...,<body>"
//!     → scgi.rs (bounded netstring + body read)
//!     → Request (method, route, params, headers, body)
//!
//! handler output
//!     → Response (status, headers, body)
//!     → "Status: 200 OK\r\n...\r\n\r\n<body>"
//! ```
//!
//! # Design Decisions
//! - Reads block; a worker serves exactly one connection
//! - Header block and body are bounded by configured limits
//! - `Response::send` consumes the response, so it is written at most once

pub mod method;
pub mod request;
pub mod response;
pub mod scgi;
pub mod status;

pub use method::Method;
pub use request::Request;
pub use response::Response;
pub use scgi::{encode_request, read_request, ProtocolError, RequestLimits};
pub use status::StatusCode;
