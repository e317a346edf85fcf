//! Worker subsystem: one isolated unit per accepted connection.
//!
//! # Data Flow
//! ```text
//! acceptor → WorkerStrategy::spawn(conn)
//!     process.rs: fork → child releases parent descriptors,
//!                 restores signal delivery → Worker::serve_stream → exit(status)
//!     thread.rs:  OS thread → Worker::serve_stream
//!
//! Worker::serve_stream (exchange.rs):
//!     reading → routing → handling → sending → exiting
//! ```
//!
//! # Design Decisions
//! - Exactly one Request/Response pair per unit, never shared
//! - Any failure goes straight to exit; errors surface only as exit status
//! - Handler panics are contained and reported as a distinct status
//! - The dispatching process never runs request logic

pub mod exchange;
pub mod process;
pub mod strategy;
pub mod thread;

pub use exchange::{Worker, WorkerExit};
pub use process::ProcessStrategy;
pub use strategy::{strategy_for, WorkerError, WorkerStrategy};
pub use thread::ThreadStrategy;
