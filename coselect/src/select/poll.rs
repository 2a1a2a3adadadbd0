use super::fileno::Fileno;
use super::flags::{PollFlags, interest_from_mask, mask_from_revents};
use super::watchers::WatcherSet;
use crate::error::{Error, Result};
use crate::reactor::io::EvFlags;
use crate::sync::Event;

use log::trace;
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A cooperative replacement for `poll(2)`.
///
/// A `Poll` keeps a table of registered descriptors and their interest.
/// [`poll`](Self::poll) waits on all of them at once, suspending only the
/// calling task. The table is plain data: registering does not touch the
/// hub, and dropping a `Poll` releases nothing but memory.
///
/// Only [`POLLIN`](super::POLLIN) and [`POLLOUT`](super::POLLOUT) are
/// waited for. Other bits are accepted and ignored; in particular a
/// descriptor registered for [`POLLPRI`](super::POLLPRI) alone never
/// reports anything but [`POLLNVAL`](super::POLLNVAL).
///
/// # Examples
///
/// ```rust,ignore
/// let mut poll = Poll::new();
/// poll.register(&stream, Some(POLLIN))?;
///
/// for (fd, events) in poll.poll(Some(500.0)).await? {
///     println!("{fd} -> {events:?}");
/// }
/// ```
#[derive(Debug, Default)]
pub struct Poll {
    fds: HashMap<RawFd, EvFlags>,
}

impl Poll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `fd`, replacing any previous registration.
    ///
    /// `None` watches for both `POLLIN` and `POLLOUT`.
    pub fn register<F: Fileno + ?Sized>(
        &mut self,
        fd: &F,
        eventmask: Option<PollFlags>,
    ) -> Result<()> {
        let fd = fd.fileno()?;
        self.fds.insert(fd, interest_from_mask(eventmask));

        Ok(())
    }

    /// Changes the interest of `fd`. Behaves exactly like
    /// [`register`](Self::register), including for descriptors that were
    /// not registered yet.
    pub fn modify<F: Fileno + ?Sized>(&mut self, fd: &F, eventmask: PollFlags) -> Result<()> {
        self.register(fd, Some(eventmask))
    }

    /// Removes `fd` from the table.
    ///
    /// # Errors
    ///
    /// [`Error::NotRegistered`] if `fd` was not registered.
    pub fn unregister<F: Fileno + ?Sized>(&mut self, fd: &F) -> Result<()> {
        let fd = fd.fileno()?;

        match self.fds.remove(&fd) {
            Some(_) => Ok(()),
            None => Err(Error::NotRegistered(fd)),
        }
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    pub fn contains<F: Fileno + ?Sized>(&self, fd: &F) -> bool {
        fd.fileno().is_ok_and(|fd| self.fds.contains_key(&fd))
    }

    /// Waits for events on the registered descriptors.
    ///
    /// `timeout_ms` is in milliseconds. `None` or a negative value waits
    /// until something is ready; zero checks once, yielding to the hub.
    ///
    /// Returns one `(fd, events)` pair per readiness observed, in the order
    /// observed and without repeats. A descriptor that is no longer open is
    /// reported with `POLLNVAL`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTimeout`] if `timeout_ms` is NaN.
    /// - [`Error::Os`] if a watcher cannot be created.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a hub.
    pub async fn poll(&self, timeout_ms: Option<f64>) -> Result<Vec<(RawFd, PollFlags)>> {
        let timeout = match timeout_ms {
            Some(ms) if ms.is_nan() => return Err(Error::InvalidTimeout(ms)),
            Some(ms) if ms >= 0.0 => {
                Some(Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX))
            }
            _ => None,
        };

        let results = Arc::new(Mutex::new(Vec::<(RawFd, PollFlags)>::new()));
        let event = Event::new();
        let mut watchers = WatcherSet::new();

        for (&fd, &events) in &self.fds {
            let results = results.clone();
            let event = event.clone();

            watchers.watch(&[fd], events, move |_, _| {
                let results = results.clone();
                let event = event.clone();

                move |revents| {
                    let entry = (fd, mask_from_revents(revents));

                    {
                        let mut results = results.lock().unwrap();
                        if !results.contains(&entry) {
                            results.push(entry);
                        }
                    }

                    event.set();
                }
            })?;
        }

        event.wait(timeout).await;
        watchers.close_all();

        let results = std::mem::take(&mut *results.lock().unwrap());
        trace!("poll returned {results:?}");

        Ok(results)
    }
}
