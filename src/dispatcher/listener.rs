//! The contract every descriptor registered with the dispatcher fulfils.

use crate::dispatcher::Control;

/// Readiness classes a listener wants to be woken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest {
    /// Wake when the descriptor can be read without blocking.
    pub readable: bool,
    /// Wake when the descriptor can be written without blocking.
    pub writable: bool,
    /// Edge-triggered delivery. Listeners must then drain until "would block".
    pub edge_triggered: bool,
}

impl Interest {
    /// Edge-triggered read readiness, the common case for accept and signal sources.
    pub const READABLE: Interest = Interest {
        readable: true,
        writable: false,
        edge_triggered: true,
    };

    /// Same interest, delivered level-triggered.
    pub fn level_triggered(mut self) -> Self {
        self.edge_triggered = false;
        self
    }
}

impl Default for Interest {
    fn default() -> Self {
        Self::READABLE
    }
}

/// Callback set bound to one descriptor inside the [`Dispatcher`](crate::dispatcher::Dispatcher).
///
/// Every callback has an empty default, so an implementor only overrides the
/// event classes it cares about; the rest are ignored for that descriptor.
/// The listener's `Drop` is its destructor: it runs when the registration is
/// removed, when the dispatcher's loop exits, or when a worker detaches.
/// State the listener needs (the "opaque data") lives in the implementing type.
pub trait Listener {
    /// Which readiness classes to register for.
    fn interest(&self) -> Interest {
        Interest::default()
    }

    /// The descriptor has data (or a pending connection, or a signal record).
    fn on_input(&mut self, _ctl: &mut Control<'_>) {}

    /// The descriptor accepts writes.
    fn on_output(&mut self, _ctl: &mut Control<'_>) {}

    /// The peer closed its writing half.
    fn on_closed(&mut self, _ctl: &mut Control<'_>) {}

    /// An error condition is pending on the descriptor.
    fn on_error(&mut self, _ctl: &mut Control<'_>) {}

    /// The descriptor hung up.
    fn on_hangup(&mut self, _ctl: &mut Control<'_>) {}
}
