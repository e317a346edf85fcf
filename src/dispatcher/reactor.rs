//! The epoll-backed readiness loop.
//!
//! # Responsibilities
//! - Own the descriptor → listener registry
//! - Translate epoll readiness flags into listener callbacks
//! - Honour stop requests issued from inside callbacks
//! - Run listener destructors on removal and on loop exit

use std::collections::HashMap;
use std::os::fd::{BorrowedFd, RawFd};

use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};

use crate::dispatcher::{Interest, Listener};

/// Readiness notifications fetched per wait call.
const DEFAULT_EVENT_BATCH: usize = 64;

/// Errors raised by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to create epoll instance: {0}")]
    Create(#[source] Errno),

    #[error("descriptor {0} is already registered")]
    AlreadyRegistered(RawFd),

    #[error("failed to register descriptor {fd}: {source}")]
    Register {
        fd: RawFd,
        #[source]
        source: Errno,
    },

    #[error("descriptor {0} is not registered")]
    NotRegistered(RawFd),

    #[error("dispatcher is detached from its epoll instance")]
    Detached,

    #[error("epoll wait failed: {0}")]
    Wait(#[source] Errno),
}

type Registry = HashMap<RawFd, Box<dyn Listener>>;

/// Single-threaded readiness loop multiplexing every registered descriptor.
pub struct Dispatcher {
    /// `None` once a worker detached from the parent's loop.
    epoll: Option<Epoll>,
    registry: Registry,
    stopping: bool,
    batch_size: usize,
}

impl Dispatcher {
    /// Create a dispatcher with its own epoll instance.
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_batch_size(DEFAULT_EVENT_BATCH)
    }

    /// Create a dispatcher fetching up to `batch_size` notifications per wait.
    pub fn with_batch_size(batch_size: usize) -> Result<Self, DispatchError> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC).map_err(DispatchError::Create)?;
        Ok(Self {
            epoll: Some(epoll),
            registry: HashMap::new(),
            stopping: false,
            batch_size: batch_size.max(1),
        })
    }

    /// Register `listener` for `fd`.
    ///
    /// The descriptor must stay open for as long as it is registered; it is
    /// usually owned by the listener itself.
    pub fn add_listener(&mut self, fd: RawFd, listener: Box<dyn Listener>) -> Result<(), DispatchError> {
        if self.registry.contains_key(&fd) {
            return Err(DispatchError::AlreadyRegistered(fd));
        }

        let epoll = self.epoll.as_ref().ok_or(DispatchError::Detached)?;
        let event = EpollEvent::new(epoll_flags(listener.interest()), fd as u64);
        // SAFETY: the caller keeps `fd` open while it is registered.
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        epoll
            .add(borrowed, event)
            .map_err(|source| DispatchError::Register { fd, source })?;

        self.registry.insert(fd, listener);
        tracing::debug!(fd, "Listener registered");
        Ok(())
    }

    /// Remove the registration for `fd`, running the listener's destructor.
    pub fn remove_listener(&mut self, fd: RawFd) -> Result<(), DispatchError> {
        let listener = self
            .registry
            .remove(&fd)
            .ok_or(DispatchError::NotRegistered(fd))?;
        unwatch(self.epoll.as_ref(), fd);
        drop(listener);
        Ok(())
    }

    /// Number of active registrations.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Ask a not-yet-started loop to return right after its first batch.
    pub fn stop(&mut self) {
        self.stopping = true;
    }

    /// Run the readiness loop until a callback calls [`Control::stop`].
    ///
    /// The batch in which the stop is requested is delivered completely.
    /// Every remaining registration is destroyed when the loop returns.
    pub fn start(&mut self) -> Result<(), DispatchError> {
        let mut events = vec![EpollEvent::empty(); self.batch_size];

        let outcome = loop {
            if self.stopping {
                break Ok(());
            }

            let ready = {
                let Some(epoll) = self.epoll.as_ref() else {
                    break Err(DispatchError::Detached);
                };
                match epoll.wait(&mut events, EpollTimeout::NONE) {
                    Ok(ready) => ready,
                    Err(Errno::EINTR) => continue,
                    Err(e) => break Err(DispatchError::Wait(e)),
                }
            };

            for event in &events[..ready] {
                self.deliver(event.data() as RawFd, event.events());
            }
        };

        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Dispatcher loop aborted");
        }

        self.stopping = false;
        self.clear();
        outcome
    }

    fn deliver(&mut self, fd: RawFd, flags: EpollFlags) {
        // Deregistered earlier in this batch.
        let Some(mut listener) = self.registry.remove(&fd) else {
            return;
        };

        let mut ctl = Control {
            fd,
            keep: true,
            stopping: &mut self.stopping,
            registry: &mut self.registry,
            epoll: &mut self.epoll,
        };

        if flags.contains(EpollFlags::EPOLLERR) {
            listener.on_error(&mut ctl);
        }
        if flags.contains(EpollFlags::EPOLLIN) && ctl.keep {
            listener.on_input(&mut ctl);
        }
        if flags.contains(EpollFlags::EPOLLOUT) && ctl.keep {
            listener.on_output(&mut ctl);
        }
        if flags.contains(EpollFlags::EPOLLRDHUP) && ctl.keep {
            listener.on_closed(&mut ctl);
        }
        if flags.contains(EpollFlags::EPOLLHUP) && ctl.keep {
            listener.on_hangup(&mut ctl);
        }

        if ctl.keep && ctl.epoll.is_some() {
            self.registry.insert(fd, listener);
        }
    }

    fn clear(&mut self) {
        for (fd, listener) in self.registry.drain() {
            unwatch(self.epoll.as_ref(), fd);
            drop(listener);
        }
    }

    /// Control handle for driving a listener callback outside the loop.
    #[cfg(test)]
    pub(crate) fn control_for(&mut self, fd: RawFd) -> Control<'_> {
        Control {
            fd,
            keep: true,
            stopping: &mut self.stopping,
            registry: &mut self.registry,
            epoll: &mut self.epoll,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registrations", &self.registry.len())
            .field("attached", &self.epoll.is_some())
            .field("stopping", &self.stopping)
            .finish()
    }
}

/// Handle given to a listener while one of its callbacks runs.
pub struct Control<'a> {
    fd: RawFd,
    keep: bool,
    stopping: &'a mut bool,
    registry: &'a mut Registry,
    epoll: &'a mut Option<Epoll>,
}

impl Control<'_> {
    /// Descriptor whose readiness is being delivered.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Exit the loop once the current batch has been delivered. Idempotent.
    pub fn stop(&mut self) {
        if !*self.stopping {
            tracing::debug!(fd = self.fd, "Dispatcher stop requested");
        }
        *self.stopping = true;
    }

    pub fn is_stopping(&self) -> bool {
        *self.stopping
    }

    /// Remove a registration. Removing the current descriptor takes effect
    /// when the callback returns.
    pub fn deregister(&mut self, fd: RawFd) -> Result<(), DispatchError> {
        if fd == self.fd {
            if !self.keep {
                return Err(DispatchError::NotRegistered(fd));
            }
            self.keep = false;
            unwatch(self.epoll.as_ref(), fd);
            return Ok(());
        }

        let listener = self
            .registry
            .remove(&fd)
            .ok_or(DispatchError::NotRegistered(fd))?;
        unwatch(self.epoll.as_ref(), fd);
        drop(listener);
        Ok(())
    }

    /// Tear the dispatcher down from inside a callback.
    ///
    /// Used by a forked worker: every other registration is destroyed, the
    /// epoll instance is closed and the loop will not wait again. The calling
    /// listener is responsible for releasing its own descriptor.
    pub fn detach(&mut self) {
        for (_, listener) in self.registry.drain() {
            drop(listener);
        }
        self.epoll.take();
        self.keep = false;
        *self.stopping = true;
    }
}

fn epoll_flags(interest: Interest) -> EpollFlags {
    let mut flags = EpollFlags::EPOLLRDHUP;
    if interest.readable {
        flags |= EpollFlags::EPOLLIN;
    }
    if interest.writable {
        flags |= EpollFlags::EPOLLOUT;
    }
    if interest.edge_triggered {
        flags |= EpollFlags::EPOLLET;
    }
    flags
}

fn unwatch(epoll: Option<&Epoll>, fd: RawFd) {
    let Some(epoll) = epoll else {
        return;
    };
    // SAFETY: a descriptor stays open while it is registered, and this runs
    // before the owning listener is dropped.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    if let Err(e) = epoll.delete(borrowed) {
        tracing::debug!(fd, error = %e, "Descriptor already gone from epoll set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Probe {
        inputs: Rc<Cell<usize>>,
        dropped: Rc<Cell<bool>>,
    }

    struct ProbeListener {
        probe: Probe,
        stop_on_input: bool,
        deregister_self: bool,
    }

    impl ProbeListener {
        fn new(probe: &Probe) -> Self {
            Self {
                probe: probe.clone(),
                stop_on_input: false,
                deregister_self: false,
            }
        }
    }

    impl Listener for ProbeListener {
        fn on_input(&mut self, ctl: &mut Control<'_>) {
            self.probe.inputs.set(self.probe.inputs.get() + 1);
            if self.deregister_self {
                let fd = ctl.fd();
                ctl.deregister(fd).unwrap();
            }
            if self.stop_on_input {
                ctl.stop();
            }
        }
    }

    impl Drop for ProbeListener {
        fn drop(&mut self) {
            self.probe.dropped.set(true);
        }
    }

    fn readable_pair() -> (UnixStream, UnixStream) {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(b"x").unwrap();
        (tx, rx)
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut dispatcher = Dispatcher::new().unwrap();
        let (_tx, rx) = UnixStream::pair().unwrap();
        let probe = Probe::default();

        dispatcher
            .add_listener(rx.as_raw_fd(), Box::new(ProbeListener::new(&probe)))
            .unwrap();
        let err = dispatcher
            .add_listener(rx.as_raw_fd(), Box::new(ProbeListener::new(&probe)))
            .unwrap_err();

        assert!(matches!(err, DispatchError::AlreadyRegistered(fd) if fd == rx.as_raw_fd()));
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_stop_finishes_current_batch() {
        let mut dispatcher = Dispatcher::new().unwrap();
        let (_tx_a, rx_a) = readable_pair();
        let (_tx_b, rx_b) = readable_pair();
        let stopper = Probe::default();
        let bystander = Probe::default();

        let mut stopping = ProbeListener::new(&stopper);
        stopping.stop_on_input = true;
        dispatcher.add_listener(rx_a.as_raw_fd(), Box::new(stopping)).unwrap();
        dispatcher
            .add_listener(rx_b.as_raw_fd(), Box::new(ProbeListener::new(&bystander)))
            .unwrap();

        dispatcher.start().unwrap();

        assert_eq!(stopper.inputs.get(), 1);
        assert_eq!(bystander.inputs.get(), 1);
        // Loop exit destroys every registration.
        assert!(stopper.dropped.get());
        assert!(bystander.dropped.get());
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_remove_listener_runs_destructor() {
        let mut dispatcher = Dispatcher::new().unwrap();
        let (_tx, rx) = UnixStream::pair().unwrap();
        let probe = Probe::default();

        dispatcher
            .add_listener(rx.as_raw_fd(), Box::new(ProbeListener::new(&probe)))
            .unwrap();
        dispatcher.remove_listener(rx.as_raw_fd()).unwrap();

        assert!(probe.dropped.get());
        assert!(matches!(
            dispatcher.remove_listener(rx.as_raw_fd()),
            Err(DispatchError::NotRegistered(_))
        ));
    }

    #[test]
    fn test_self_deregistration_inside_callback() {
        let mut dispatcher = Dispatcher::new().unwrap();
        let (_tx_a, rx_a) = readable_pair();
        let (_tx_b, rx_b) = readable_pair();
        let leaving = Probe::default();
        let stopper = Probe::default();

        let mut leaver = ProbeListener::new(&leaving);
        leaver.deregister_self = true;
        dispatcher.add_listener(rx_a.as_raw_fd(), Box::new(leaver)).unwrap();

        let mut stopping = ProbeListener::new(&stopper);
        stopping.stop_on_input = true;
        dispatcher.add_listener(rx_b.as_raw_fd(), Box::new(stopping)).unwrap();

        dispatcher.start().unwrap();

        assert_eq!(leaving.inputs.get(), 1);
        assert!(leaving.dropped.get());
    }

    #[test]
    fn test_detach_destroys_registrations() {
        let mut dispatcher = Dispatcher::new().unwrap();
        let (_tx_a, rx_a) = UnixStream::pair().unwrap();
        let (_tx_b, rx_b) = UnixStream::pair().unwrap();
        let other = Probe::default();

        dispatcher
            .add_listener(rx_b.as_raw_fd(), Box::new(ProbeListener::new(&other)))
            .unwrap();

        {
            let mut ctl = dispatcher.control_for(rx_a.as_raw_fd());
            ctl.detach();
            assert!(ctl.is_stopping());
        }

        assert!(other.dropped.get());
        assert!(dispatcher.is_empty());
        assert!(matches!(
            dispatcher.add_listener(rx_a.as_raw_fd(), Box::new(ProbeListener::new(&other))),
            Err(DispatchError::Detached)
        ));
    }

    #[test]
    fn test_interest_flags() {
        let flags = epoll_flags(Interest::READABLE);
        assert!(flags.contains(EpollFlags::EPOLLIN | EpollFlags::EPOLLET | EpollFlags::EPOLLRDHUP));
        assert!(!flags.contains(EpollFlags::EPOLLOUT));

        let level = epoll_flags(Interest::READABLE.level_triggered());
        assert!(!level.contains(EpollFlags::EPOLLET));
    }
}
