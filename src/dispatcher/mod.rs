//! Readiness-multiplexing subsystem.
//!
//! # Data Flow
//! ```text
//! add_listener(fd, listener)
//!     → epoll registration (fd as event data)
//!     → registry: fd → Box<dyn Listener>
//!
//! start():
//!     epoll_wait → batch of (fd, flags)
//!     → check listener out of the registry
//!     → error / input / output / closed / hangup callbacks
//!     → check listener back in (unless it deregistered itself)
//!     → repeat until Control::stop() was observed
//! ```
//!
//! # Design Decisions
//! - Single-threaded: callbacks run to completion, no locking
//! - A stop request finishes the current batch before the loop exits
//! - The dispatcher never closes descriptors; dropping a listener is its destructor
//! - Listening socket and signal channel share one loop, so control-plane events are serialized

pub mod listener;
pub mod reactor;

pub use listener::{Interest, Listener};
pub use reactor::{Control, DispatchError, Dispatcher};
