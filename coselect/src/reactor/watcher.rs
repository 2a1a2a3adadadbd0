use super::io::{EvFlags, Revents};
use crate::runtime::context;
use crate::utils::Key;

use std::io;
use std::os::fd::RawFd;

/// Handle to an I/O watcher living in the current hub's loop.
///
/// The handle only stores the watcher key, so it can be held across
/// `.await` points by `Send` futures. Every operation goes through the
/// thread-local hub context.
///
/// Dropping the handle closes the watcher.
#[derive(Debug)]
pub(crate) struct IoWatcher {
    key: Key,
}

impl IoWatcher {
    /// Creates a stopped watcher for `fd` with the given interest.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a hub.
    pub(crate) fn new(fd: RawFd, events: EvFlags) -> io::Result<Self> {
        let key = context::with_loop(|lp| lp.io(fd, events))?;

        Ok(Self { key })
    }

    pub(crate) fn key(&self) -> Key {
        self.key
    }

    pub(crate) fn set_priority(&self, priority: i8) {
        context::with_loop(|lp| lp.set_priority(self.key, priority));
    }

    /// Starts the watcher. `callback` runs on the hub thread every time the
    /// descriptor is ready for the watcher's interest.
    pub(crate) fn start(&self, callback: impl FnMut(Revents) + 'static) {
        context::with_loop(|lp| lp.start(self.key, Box::new(callback)));
    }

    pub(crate) fn stop(&self) {
        context::try_with_loop(|lp| lp.stop(self.key));
    }

    /// Stops and releases the watcher. Safe to call repeatedly.
    pub(crate) fn close(&self) {
        close(self.key);
    }
}

impl Drop for IoWatcher {
    fn drop(&mut self) {
        close(self.key);
    }
}

/// Closes the watcher identified by `key`.
///
/// Usable from inside the watcher's own callback. Outside of a hub, or
/// once the hub is gone, this does nothing.
pub(crate) fn close(key: Key) {
    // The entry (and its callback) is dropped here, after the loop borrow
    // has been released.
    let entry = context::try_with_loop(|lp| lp.close(key)).flatten();
    drop(entry);
}
