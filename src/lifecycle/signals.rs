//! OS signal plumbing.
//!
//! # Responsibilities
//! - Block the control signals so they are only observable through a descriptor
//! - Expose pending signals as a non-blocking, pollable source
//! - Restore default delivery in workers

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use nix::errno::Errno;
use nix::sys::signal::{sigprocmask, SigSet, SigmaskHow, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};

/// Errors raised while installing or reading the signal channel.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("unable to change signal mask: {0}")]
    Mask(#[source] Errno),

    #[error("unable to create signalfd: {0}")]
    Channel(#[source] Errno),
}

/// Signals the server observes through its readiness loop.
pub fn control_signals() -> SigSet {
    let mut mask = SigSet::empty();
    // Termination
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGQUIT);
    mask.add(Signal::SIGTERM);
    // Worker status changes
    mask.add(Signal::SIGCHLD);
    // Reload request
    mask.add(Signal::SIGHUP);
    mask
}

/// Block the control signals for the calling thread and the threads it spawns.
pub fn block_control_signals() -> Result<SigSet, SignalError> {
    let mask = control_signals();
    sigprocmask(SigmaskHow::SIG_BLOCK, Some(&mask), None).map_err(SignalError::Mask)?;
    Ok(mask)
}

/// Undo [`block_control_signals`]; workers behave like ordinary processes.
pub fn restore_default_delivery() -> Result<(), SignalError> {
    sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&control_signals()), None).map_err(SignalError::Mask)
}

/// A source of pending signal numbers.
///
/// `Ok(None)` means nothing is pending right now ("would block").
pub trait SignalSource {
    fn next_signal(&mut self) -> Result<Option<i32>, Errno>;
}

/// Non-blocking signalfd carrying the control signals.
#[derive(Debug)]
pub struct SignalChannel {
    fd: SignalFd,
}

impl SignalChannel {
    /// Block the control signals and open a descriptor that reports them.
    pub fn open() -> Result<Self, SignalError> {
        let mask = block_control_signals()?;
        let fd = SignalFd::with_flags(&mask, SfdFlags::SFD_NONBLOCK | SfdFlags::SFD_CLOEXEC)
            .map_err(SignalError::Channel)?;
        tracing::debug!(fd = fd.as_raw_fd(), "Signal channel open");
        Ok(Self { fd })
    }
}

impl SignalSource for SignalChannel {
    fn next_signal(&mut self) -> Result<Option<i32>, Errno> {
        Ok(self.fd.read_signal()?.map(|info| info.ssi_signo as i32))
    }
}

impl AsFd for SignalChannel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for SignalChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
