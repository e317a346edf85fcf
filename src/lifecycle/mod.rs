//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (signals.rs):
//!     block control signals → signalfd → registered with the dispatcher
//!
//! Signal handler (handler.rs), per readiness notification:
//!     drain signalfd until "would block"
//!     SIGINT/SIGQUIT/SIGTERM → Dispatcher stop
//!     SIGCHLD                → reaper.rs (non-blocking reap of every finished worker)
//!     SIGHUP                 → logged, reload is not implemented
//!
//! Shutdown (reaper.rs):
//!     loop returned → blocking reap until no children remain
//! ```
//!
//! # Design Decisions
//! - Signals are read from a descriptor, never from asynchronous handlers
//! - Reaping loops until no child changed state, so no zombies accumulate
//! - Workers restore the default mask; they are outside the control plane

pub mod handler;
pub mod reaper;
pub mod signals;

pub use handler::{classify, SignalAction, SignalListener};
pub use signals::{SignalChannel, SignalError, SignalSource};
