//! Fork-per-connection workers.

use std::net::TcpStream;
use std::process;

use nix::unistd::{fork, ForkResult};

use crate::lifecycle::{reaper, signals};
use crate::worker::{Worker, WorkerError, WorkerExit, WorkerStrategy};

/// Serves every connection in a child process.
///
/// Children are never waited for here; the dispatcher reaps them on
/// `SIGCHLD` and [`WorkerStrategy::drain`] collects the rest at shutdown.
#[derive(Debug)]
pub struct ProcessStrategy {
    worker: Worker,
}

impl ProcessStrategy {
    pub fn new(worker: Worker) -> Self {
        Self { worker }
    }

    fn serve_child(&self, conn: TcpStream) -> i32 {
        let span = tracing::info_span!("worker", pid = process::id());
        let _enter = span.enter();

        if let Err(e) = signals::restore_default_delivery() {
            tracing::error!(error = %e, "Could not restore signal delivery");
            return WorkerExit::ReadFailed.code();
        }

        let exit = self.worker.serve_stream(conn);
        tracing::debug!(status = exit.code(), "Worker finished");
        exit.code()
    }
}

impl WorkerStrategy for ProcessStrategy {
    fn spawn(&self, conn: TcpStream, release_parent: &mut dyn FnMut()) -> Result<(), WorkerError> {
        // SAFETY: the dispatching process runs a single thread, so the child
        // inherits no lock held by another thread.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(pid = %child, "Worker process started");
                drop(conn);
                Ok(())
            }
            Ok(ForkResult::Child) => {
                release_parent();
                let code = self.serve_child(conn);
                process::exit(code)
            }
            Err(errno) => {
                drop(conn);
                Err(WorkerError::Fork(errno))
            }
        }
    }

    fn drain(&self) {
        let reaped = reaper::reap_all_blocking();
        tracing::info!(reaped, "All worker processes finished");
    }
}
