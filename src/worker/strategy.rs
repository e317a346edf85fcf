//! Pluggable isolation for accepted connections.

use std::net::TcpStream;
use std::rc::Rc;

use nix::errno::Errno;

use crate::config::WorkerMode;
use crate::worker::{ProcessStrategy, ThreadStrategy, Worker};

/// Errors raised while starting a worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to create worker process: {0}")]
    Fork(#[source] Errno),

    #[error("failed to create worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// How an accepted connection gets its own unit of execution.
///
/// Implementations guarantee one request/response exchange per unit and no
/// mutable state shared between units.
pub trait WorkerStrategy {
    /// Hand `conn` to a new unit.
    ///
    /// `release_parent` drops every descriptor that belongs to the dispatching
    /// process only. A strategy whose unit gets a copy of the parent's
    /// descriptor table runs it inside the new unit before reading.
    /// On error the connection has already been closed.
    fn spawn(&self, conn: TcpStream, release_parent: &mut dyn FnMut()) -> Result<(), WorkerError>;

    /// Wait for every outstanding unit. Called after the dispatcher returned.
    fn drain(&self);
}

/// Strategy configured by `worker.mode`.
pub fn strategy_for(mode: WorkerMode, worker: Worker) -> Rc<dyn WorkerStrategy> {
    match mode {
        WorkerMode::Process => Rc::new(ProcessStrategy::new(worker)),
        WorkerMode::Thread => Rc::new(ThreadStrategy::new(worker)),
    }
}
