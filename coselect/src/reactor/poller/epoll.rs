//! Linux `epoll`-based poller implementation.
//!
//! This is the default backend on Linux and Android.
//!
//! Responsibilities:
//! - Register descriptors with read/write interests
//! - Block waiting for I/O readiness
//! - Wake up when a task is scheduled from another thread
//! - Support timer-driven wakeups via poll timeouts
//!
//! Descriptors are registered level-triggered with the descriptor itself
//! as the epoll token, so one registration covers every watcher the loop
//! keeps on that descriptor.

use super::common::{Interest, Notifier};
use super::platform::{cvt, sys_close};
use crate::reactor::event::Event;

use libc::{
    EFD_CLOEXEC, EFD_NONBLOCK, EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD,
    EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

/// Reserved token used internally for the wake-up event.
///
/// Descriptors are non-negative `i32` values, so `u64::MAX` never
/// collides with a registered descriptor.
const WAKE_TOKEN: u64 = u64::MAX;

/// Linux `epoll` poller.
///
/// This poller owns:
/// - an `epoll` instance,
/// - an `eventfd` notifier used as a wake-up signal,
/// - a reusable event buffer.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,

    /// Notifier wrapping the internal eventfd.
    notifier: Arc<Notifier>,
}

impl Notifier {
    /// Wakes the poller.
    ///
    /// This writes to the internal `eventfd`, causing `epoll_wait`
    /// to return immediately.
    pub(crate) fn notify(&self) {
        let buf: u64 = 1;
        unsafe {
            libc::write(self.write, &buf as *const _ as *const _, 8);
        }
    }

    /// Resets the eventfd counter after a wake-up.
    fn drain(&self) {
        let mut buf = 0u64;
        unsafe {
            libc::read(self.read, &mut buf as *mut _ as *mut _, 8);
        }
    }
}

impl EpollPoller {
    /// Creates a new `EpollPoller` able to report `capacity` events per poll.
    ///
    /// This:
    /// - creates the epoll instance,
    /// - creates a non-blocking `eventfd`,
    /// - registers the eventfd into epoll as a persistent wake source.
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = cvt(unsafe { epoll_create1(EPOLL_CLOEXEC) })?;

        let eventfd = match cvt(unsafe { libc::eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) }) {
            Ok(fd) => fd,
            Err(err) => {
                sys_close(epoll);
                return Err(err);
            }
        };

        let notifier = Arc::new(Notifier {
            read: eventfd,
            write: eventfd,
        });

        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: WAKE_TOKEN,
        };

        if let Err(err) = cvt(unsafe { epoll_ctl(epoll, EPOLL_CTL_ADD, eventfd, &mut event) }) {
            sys_close(epoll);
            return Err(err);
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(capacity.max(1)),
            notifier,
        })
    }

    /// Returns the poller notifier.
    pub(crate) fn notifier(&self) -> Arc<Notifier> {
        self.notifier.clone()
    }

    /// Registers a descriptor with the poller.
    pub(crate) fn add(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, fd, interest)
    }

    /// Updates interest flags for an already registered descriptor.
    pub(crate) fn modify(&mut self, fd: RawFd, interest: Interest) -> io::Result<()> {
        self.ctl(EPOLL_CTL_MOD, fd, interest)
    }

    /// Removes a descriptor from the poller.
    pub(crate) fn delete(&mut self, fd: RawFd) -> io::Result<()> {
        cvt(unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) })?;
        Ok(())
    }

    fn ctl(&mut self, op: i32, fd: RawFd, interest: Interest) -> io::Result<()> {
        let mut flags = 0;

        if interest.read {
            flags |= EPOLLIN;
        }
        if interest.write {
            flags |= EPOLLOUT;
        }

        let mut event = epoll_event {
            events: flags as u32,
            u64: fd as u64,
        };

        cvt(unsafe { epoll_ctl(self.epoll, op, fd, &mut event) })?;
        Ok(())
    }

    /// Polls for I/O readiness events.
    ///
    /// Blocks until:
    /// - at least one descriptor becomes ready,
    /// - the notifier is triggered,
    /// - or the optional timeout expires.
    ///
    /// An interrupted wait returns successfully with no events.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let timeout_ms = super::timeout_millis(timeout);

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            let token = ev.u64;
            let flags = ev.events;

            if token == WAKE_TOKEN {
                self.notifier.drain();
                continue;
            }

            events.push(Event {
                fd: token as RawFd,
                readable: flags & ((EPOLLIN | EPOLLERR | EPOLLHUP) as u32) != 0,
                writable: flags & ((EPOLLOUT | EPOLLERR | EPOLLHUP) as u32) != 0,
                invalid: false,
            });
        }

        unsafe {
            self.events.set_len(0);
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        sys_close(self.epoll);
    }
}
