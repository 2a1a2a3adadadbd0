use crate::reactor::poller::Interest;
use crate::utils::Key;

use bitflags::bitflags;
use std::os::fd::RawFd;

bitflags! {
    /// Interest mask of an I/O watcher.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EvFlags: u8 {
        /// The descriptor is readable.
        const READ = 0x1;
        /// The descriptor is writable.
        const WRITE = 0x2;
    }
}

/// What a watcher callback is told when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revents {
    /// The descriptor is ready for the given subset of the watcher's interest.
    Ready(EvFlags),

    /// The descriptor is not valid (closed, or rejected by the poller).
    Invalid,
}

/// Callback invoked by the loop when a watcher fires.
pub(crate) type Callback = Box<dyn FnMut(Revents)>;

/// An I/O watcher as stored by the loop.
pub(crate) struct IoEntry {
    /// Watched descriptor.
    pub(crate) fd: RawFd,

    /// Interest mask.
    pub(crate) events: EvFlags,

    /// Dispatch priority; higher runs first within a loop turn.
    pub(crate) priority: i8,

    /// Whether the watcher is attached to its descriptor.
    pub(crate) started: bool,

    /// Callback, absent while it is running or before the first start.
    pub(crate) callback: Option<Callback>,
}

/// Per-descriptor bookkeeping shared by every watcher on that descriptor.
#[derive(Default)]
pub(crate) struct FdState {
    /// Started watchers on this descriptor, in start order.
    pub(crate) watchers: Vec<Key>,

    /// Interest currently registered with the poller, if any.
    pub(crate) registered: Option<Interest>,

    /// The poller refused the descriptor as unpollable; it is reported
    /// ready on every turn instead.
    pub(crate) always_ready: bool,
}
