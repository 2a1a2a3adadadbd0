use crate::reactor::io::EvFlags;

use std::os::fd::RawFd;

/// Read/write interest handed to a poller backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) write: bool,
}

impl From<EvFlags> for Interest {
    fn from(events: EvFlags) -> Self {
        Self {
            read: events.contains(EvFlags::READ),
            write: events.contains(EvFlags::WRITE),
        }
    }
}

/// Cross-thread wake-up handle for a poller.
///
/// Writing to `write` makes `read` readable, which interrupts a blocking
/// poll. Backends may use the same descriptor for both ends (`eventfd`).
pub(crate) struct Notifier {
    pub(crate) read: RawFd,
    pub(crate) write: RawFd,
}

impl Drop for Notifier {
    fn drop(&mut self) {
        super::platform::sys_close(self.write);

        if self.read != self.write {
            super::platform::sys_close(self.read);
        }
    }
}
