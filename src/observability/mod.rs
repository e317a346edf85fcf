//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, acceptor, signal handler, workers
//!     → tracing events with structured fields
//!     → logging.rs (EnvFilter + fmt layer)
//!     → stderr
//! ```
//!
//! # Design Decisions
//! - Structured fields (`pid`, `fd`, `peer`) instead of formatted strings
//! - RUST_LOG overrides the configured level
//! - Workers log inside a `worker` span so lines can be told apart by pid

pub mod logging;
