use std::os::fd::RawFd;

/// An I/O event reported by the poller.
///
/// An `Event` represents readiness information for one registered
/// descriptor. It is produced by the poller and consumed by the loop,
/// which fans it out to every watcher started on that descriptor.
///
/// Error and hang-up conditions are folded into both `readable` and
/// `writable`, so a watcher of either kind observes them.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Event {
    /// The descriptor the event was reported for.
    pub(crate) fd: RawFd,

    /// Indicates that the descriptor is readable.
    pub(crate) readable: bool,

    /// Indicates that the descriptor is writable.
    pub(crate) writable: bool,

    /// The kernel reported the descriptor as not open.
    pub(crate) invalid: bool,
}
