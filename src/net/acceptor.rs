//! Readiness-driven accept loop.
//!
//! # Responsibilities
//! - Accept every pending connection on each readiness event
//! - Hand each connection to the worker strategy
//! - Survive transient accept and spawn failures

use std::io::ErrorKind;
use std::net::TcpListener;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;

use crate::dispatcher::{Control, Listener};
use crate::worker::WorkerStrategy;

/// Dispatcher listener owning the server socket.
pub struct ConnectionListener {
    /// `None` once released inside a forked worker.
    socket: Option<TcpListener>,
    strategy: Rc<dyn WorkerStrategy>,
}

impl ConnectionListener {
    pub fn new(socket: TcpListener, strategy: Rc<dyn WorkerStrategy>) -> Self {
        Self {
            socket: Some(socket),
            strategy,
        }
    }

    pub fn raw_fd(&self) -> Option<RawFd> {
        self.socket.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Accept until the backlog is empty. Returns the number of connections accepted.
    fn accept_pending(&mut self, ctl: &mut Control<'_>) -> usize {
        let mut accepted = 0;

        loop {
            let Some(listener) = self.socket.as_ref() else {
                break;
            };

            match listener.accept() {
                Ok((conn, peer)) => {
                    accepted += 1;
                    tracing::debug!(peer = %peer, "Connection accepted");

                    let socket = &mut self.socket;
                    let mut release = || {
                        ctl.detach();
                        drop(socket.take());
                    };
                    if let Err(e) = self.strategy.spawn(conn, &mut release) {
                        tracing::error!(error = %e, peer = %peer, "Failed to start worker");
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::ConnectionAborted) => {
                    continue
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    break;
                }
            }
        }

        accepted
    }
}

impl Listener for ConnectionListener {
    fn on_input(&mut self, ctl: &mut Control<'_>) {
        let accepted = self.accept_pending(ctl);
        tracing::trace!(accepted, "Accept backlog drained");
    }

    fn on_error(&mut self, ctl: &mut Control<'_>) {
        tracing::error!(fd = ctl.fd(), "Error condition on server socket");
    }
}

impl std::fmt::Debug for ConnectionListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionListener")
            .field("fd", &self.raw_fd())
            .finish()
    }
}
