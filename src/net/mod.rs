//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (bind, non-blocking)
//!     → acceptor.rs (readable → accept until EAGAIN)
//!     → WorkerStrategy::spawn (one worker per connection)
//! ```
//!
//! # Design Decisions
//! - Edge-triggered readiness, so every pending connection is drained per event
//! - Accept failures never stop the loop
//! - The dispatching process closes its copy of each connection immediately

pub mod acceptor;
pub mod listener;

pub use acceptor::ConnectionListener;
pub use listener::{bind, ListenerError};
