//! Readiness callback for the signal channel.
//!
//! # Responsibilities
//! - Drain every pending signal record per notification
//! - Stop the dispatcher on termination signals
//! - Reap finished workers on SIGCHLD
//!
//! # Design Decisions
//! - A failed read is logged and ends the drain; it never stops the server
//! - Reload (SIGHUP) is acknowledged in the log and otherwise ignored

use nix::errno::Errno;
use nix::sys::signal::Signal;

use crate::dispatcher::{Control, Listener};
use crate::lifecycle::reaper;
use crate::lifecycle::SignalSource;

/// What the server does with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// SIGINT, SIGQUIT, SIGTERM.
    Terminate,
    /// SIGCHLD.
    ReapChildren,
    /// SIGHUP.
    Reload,
    /// Anything else.
    Unexpected,
}

pub fn classify(signo: i32) -> SignalAction {
    match Signal::try_from(signo) {
        Ok(Signal::SIGINT | Signal::SIGQUIT | Signal::SIGTERM) => SignalAction::Terminate,
        Ok(Signal::SIGCHLD) => SignalAction::ReapChildren,
        Ok(Signal::SIGHUP) => SignalAction::Reload,
        _ => SignalAction::Unexpected,
    }
}

/// Listener bound to the signal channel.
pub struct SignalListener<S> {
    source: S,
    reap: fn() -> usize,
}

impl<S: SignalSource> SignalListener<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            reap: reaper::reap_finished,
        }
    }

    /// Replace the function used to reap finished workers.
    pub fn with_reaper(mut self, reap: fn() -> usize) -> Self {
        self.reap = reap;
        self
    }

    fn handle(&mut self, signo: i32, ctl: &mut Control<'_>) {
        match classify(signo) {
            SignalAction::Terminate => {
                tracing::info!(signal = signo, "Termination signal received");
                ctl.stop();
            }
            SignalAction::ReapChildren => {
                let reaped = (self.reap)();
                tracing::debug!(reaped, "Child signaled");
            }
            SignalAction::Reload => {
                tracing::info!("Configuration reload is not implemented");
            }
            SignalAction::Unexpected => {
                tracing::error!(signal = signo, "Unexpected signal arrived");
            }
        }
    }
}

impl<S: SignalSource> Listener for SignalListener<S> {
    fn on_input(&mut self, ctl: &mut Control<'_>) {
        loop {
            match self.source.next_signal() {
                Ok(Some(signo)) => self.handle(signo, ctl),
                Ok(None) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Unable to get signal info");
                    break;
                }
            }
        }
    }

    fn on_error(&mut self, ctl: &mut Control<'_>) {
        tracing::error!(fd = ctl.fd(), "Error condition on signal channel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(classify(libc_signo(Signal::SIGINT)), SignalAction::Terminate);
        assert_eq!(classify(libc_signo(Signal::SIGQUIT)), SignalAction::Terminate);
        assert_eq!(classify(libc_signo(Signal::SIGTERM)), SignalAction::Terminate);
        assert_eq!(classify(libc_signo(Signal::SIGCHLD)), SignalAction::ReapChildren);
        assert_eq!(classify(libc_signo(Signal::SIGHUP)), SignalAction::Reload);
        assert_eq!(classify(libc_signo(Signal::SIGUSR2)), SignalAction::Unexpected);
        assert_eq!(classify(0), SignalAction::Unexpected);
        assert_eq!(classify(9999), SignalAction::Unexpected);
    }

    fn libc_signo(signal: Signal) -> i32 {
        signal as i32
    }
}
