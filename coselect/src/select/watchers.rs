use crate::error::Result;
use crate::reactor::io::{EvFlags, Revents};
use crate::reactor::{IoWatcher, MAXPRI};
use crate::utils::Key;

use std::os::fd::RawFd;

/// The watchers started by one `select` or `poll` call.
///
/// Every watcher is tracked before it is started, so whatever happens to
/// the call (return, timeout, error, or the task being aborted) dropping
/// the set stops and closes all of them.
#[derive(Debug, Default)]
pub(crate) struct WatcherSet {
    watchers: Vec<IoWatcher>,
}

impl WatcherSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates and starts one `MAXPRI` watcher per descriptor.
    ///
    /// `make_callback` receives the descriptor's position in `fds` and the
    /// key of its watcher. If creating a watcher fails, the error is
    /// returned and the watchers started so far stay in the set.
    pub(crate) fn watch<F, C>(
        &mut self,
        fds: &[RawFd],
        events: EvFlags,
        mut make_callback: F,
    ) -> Result<()>
    where
        F: FnMut(usize, Key) -> C,
        C: FnMut(Revents) + 'static,
    {
        for (index, &fd) in fds.iter().enumerate() {
            let watcher = IoWatcher::new(fd, events)?;
            watcher.set_priority(MAXPRI);

            let callback = make_callback(index, watcher.key());

            self.watchers.push(watcher);
            if let Some(watcher) = self.watchers.last() {
                watcher.start(callback);
            }
        }

        Ok(())
    }

    /// Stops and closes every tracked watcher, then forgets them.
    /// Calling it again does nothing.
    pub(crate) fn close_all(&mut self) {
        for watcher in self.watchers.drain(..) {
            watcher.stop();
            watcher.close();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.watchers.len()
    }
}

impl Drop for WatcherSet {
    fn drop(&mut self) {
        self.close_all();
    }
}
