//! Portable `poll(2)`-based poller implementation.
//!
//! This backend serves Unix targets without `epoll`. It mirrors the
//! semantics of the `epoll` poller using a registration table rebuilt
//! into a `pollfd` array on every wait and a self-pipe for wake-ups.
//!
//! Unlike `epoll`, `poll(2)` reports `POLLNVAL` for descriptors that were
//! closed while registered; those are surfaced as invalid events.

use super::common::{Interest, Notifier};
use super::platform::sys_pipe;
use crate::reactor::event::Event;

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, nfds_t, pollfd};
use std::collections::HashMap;
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Poller based on `poll(2)`.
pub(crate) struct PollPoller {
    /// Registered descriptors: `fd → interest`.
    reg: HashMap<RawFd, Interest>,

    /// Reusable `pollfd` buffer; slot 0 is the wake-up pipe.
    fds: Vec<pollfd>,

    /// Notifier wrapping the self-pipe.
    notifier: Arc<Notifier>,
}

impl Notifier {
    /// Wakes the poller by writing one byte to the self-pipe.
    pub(crate) fn notify(&self) {
        let buf = [1u8; 1];
        unsafe {
            libc::write(self.write, buf.as_ptr() as *const _, 1);
        }
    }

    /// Empties the self-pipe after a wake-up.
    fn drain(&self) {
        let mut buf = [0u8; 64];
        while unsafe { libc::read(self.read, buf.as_mut_ptr() as *mut _, buf.len()) } > 0 {}
    }
}

impl PollPoller {
    /// Creates a new `PollPoller`.
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let (read, write) = sys_pipe()?;

        Ok(Self {
            reg: HashMap::with_capacity(capacity),
            fds: Vec::with_capacity(capacity + 1),
            notifier: Arc::new(Notifier { read, write }),
        })
    }

    /// Returns the poller notifier.
    pub(crate) fn notifier(&self) -> Arc<Notifier> {
        self.notifier.clone()
    }

    /// Registers a descriptor with the poller.
    pub(crate) fn add(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.reg.insert(fd, interest);
        Ok(())
    }

    /// Updates interest flags for a registered descriptor.
    pub(crate) fn modify(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.reg.insert(fd, interest);
        Ok(())
    }

    /// Removes a descriptor from the poller.
    pub(crate) fn delete(&mut self, fd: RawFd) -> io::Result<()> {
        self.reg.remove(&fd);
        Ok(())
    }

    /// Polls for I/O readiness events.
    ///
    /// Blocks until a registered descriptor is ready, the notifier fires,
    /// or the optional timeout expires.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();
        self.fds.clear();

        self.fds.push(pollfd {
            fd: self.notifier.read,
            events: POLLIN,
            revents: 0,
        });

        for (&fd, &interest) in self.reg.iter() {
            let mut ev = 0;
            if interest.read {
                ev |= POLLIN;
            }
            if interest.write {
                ev |= POLLOUT;
            }

            self.fds.push(pollfd {
                fd,
                events: ev,
                revents: 0,
            });
        }

        let timeout_ms = super::timeout_millis(timeout);

        let rc = unsafe { libc::poll(self.fds.as_mut_ptr(), self.fds.len() as nfds_t, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        if self.fds[0].revents != 0 {
            self.notifier.drain();
        }

        for pfd in self.fds.iter().skip(1) {
            let re = pfd.revents;
            if re == 0 {
                continue;
            }

            events.push(Event {
                fd: pfd.fd,
                readable: re & (POLLIN | POLLERR | POLLHUP) != 0,
                writable: re & (POLLOUT | POLLERR | POLLHUP) != 0,
                invalid: re & POLLNVAL != 0,
            });
        }

        Ok(())
    }
}
