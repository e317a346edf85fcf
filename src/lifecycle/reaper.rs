//! Worker process reaping.

use nix::errno::Errno;
use nix::sys::wait::{wait, waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// Reap every child whose state changed, without blocking.
///
/// Returns how many children finished (exited or were killed).
pub fn reap_finished() -> usize {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    let mut reaped = 0;

    loop {
        match waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if record(status) {
                    reaped += 1;
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed when waiting for children");
                break;
            }
        }
    }

    reaped
}

/// Block until every child has terminated.
pub fn reap_all_blocking() -> usize {
    let mut reaped = 0;

    loop {
        match wait() {
            Ok(status) => {
                if record(status) {
                    reaped += 1;
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed when waiting for children");
                break;
            }
        }
    }

    reaped
}

/// Log a status change. Returns true when the child is gone.
fn record(status: WaitStatus) -> bool {
    match status {
        WaitStatus::Exited(pid, code) => {
            if code == 0 {
                tracing::debug!(pid = %pid, code, "Worker exited");
            } else {
                tracing::warn!(pid = %pid, code, "Worker exited with failure");
            }
            true
        }
        WaitStatus::Signaled(pid, signal, core_dumped) => {
            tracing::error!(pid = %pid, signal = ?signal, core_dumped, "Worker was terminated by signal");
            true
        }
        WaitStatus::Stopped(pid, signal) => {
            tracing::error!(pid = %pid, signal = ?signal, "Worker was stopped by signal");
            false
        }
        WaitStatus::Continued(pid) => {
            tracing::error!(pid = %pid, "Worker continued its execution");
            false
        }
        other => {
            tracing::debug!(status = ?other, "Ignoring child status");
            false
        }
    }
}
