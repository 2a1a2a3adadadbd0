//! Cooperative `select()` and `poll()`.
//!
//! Both block only the calling task: readiness is waited for with I/O
//! watchers on the hub's loop, while other tasks keep running.
//!
//! - [`select`] checks lists of descriptors for readability and
//!   writability, with an optional timeout in seconds.
//! - [`Poll`] keeps a table of registered descriptors and waits on all of
//!   them at once, with a timeout in milliseconds.

mod collector;
mod fileno;
mod flags;
mod poll;
mod preflight;
mod watchers;

pub use fileno::Fileno;
pub use flags::{
    POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, POLLPRI, POLLRDBAND, POLLRDNORM, POLLWRBAND,
    POLLWRNORM, PollFlags,
};
pub use poll::Poll;

use crate::error::{Error, Result};
use crate::reactor::io::EvFlags;
use crate::runtime::yield_now::yield_now;
use collector::{List, ReadySet};
use watchers::WatcherSet;

use log::trace;
use std::os::fd::RawFd;
use std::time::Duration;

/// Descriptors found ready by [`select`].
///
/// Each list holds copies of the matching input entries, in the order
/// readiness was observed. Passing references (`&[&stream]`) gets the
/// references back.
#[derive(Debug)]
pub struct Selected<T> {
    pub readable: Vec<T>,
    pub writable: Vec<T>,
    pub exceptional: Vec<T>,
}

impl<T> Selected<T> {
    /// Returns `true` if nothing was ready.
    pub fn is_empty(&self) -> bool {
        self.readable.is_empty() && self.writable.is_empty() && self.exceptional.is_empty()
    }
}

/// Waits until some of the given descriptors are ready.
///
/// `rlist` is watched for readability and `wlist` for writability. `xlist`
/// is only checked by the initial zero-timeout kernel `select()`; while
/// waiting, exceptional conditions are not observed and `exceptional` comes
/// back empty.
///
/// `timeout` is in seconds. `None` waits until something is ready; zero
/// polls once, yielding to the hub before returning.
///
/// # Errors
///
/// - [`Error::InvalidTimeout`] for a negative or NaN timeout, before any
///   descriptor is looked at.
/// - [`Error::NegativeDescriptor`] if an entry does not resolve to a
///   descriptor.
/// - [`Error::Os`] as reported by the kernel, notably `EBADF` for a closed
///   descriptor.
///
/// # Panics
///
/// Panics if called outside of a hub.
///
/// # Examples
///
/// ```rust,ignore
/// let ready = coselect::select(&[&reader], &[], &[], Some(1.5)).await?;
/// if ready.readable.is_empty() {
///     println!("timed out");
/// }
/// ```
pub async fn select<T: Fileno + Clone>(
    rlist: &[T],
    wlist: &[T],
    xlist: &[T],
    timeout: Option<f64>,
) -> Result<Selected<T>> {
    let timeout = timeout.map(seconds).transpose()?;

    let rfds = resolve(rlist)?;
    let wfds = resolve(wlist)?;
    let xfds = resolve(xlist)?;

    let preflight = match preflight::select_now(&rfds, &wfds, &xfds) {
        Ok(preflight) => preflight,
        Err(err) if err.is_interrupted() => {
            trace!("pre-flight interrupted, waiting cooperatively");
            preflight::Preflight::default()
        }
        Err(err) => return Err(err),
    };

    if !preflight.is_empty() || timeout == Some(Duration::ZERO) {
        trace!("select answered by pre-flight: {preflight:?}");
        yield_now().await;

        return Ok(Selected {
            readable: pick(rlist, &preflight.readable),
            writable: pick(wlist, &preflight.writable),
            exceptional: pick(xlist, &preflight.exceptional),
        });
    }

    let ready = ReadySet::new();
    let mut watchers = WatcherSet::new();

    watchers.watch(&rfds, EvFlags::READ, |index, key| {
        ready.callback(List::Read, index, key)
    })?;
    watchers.watch(&wfds, EvFlags::WRITE, |index, key| {
        ready.callback(List::Write, index, key)
    })?;
    trace!("select waiting on {} watchers", watchers.len());

    ready.event().wait(timeout).await;
    watchers.close_all();

    let (readable, writable, _) = ready.take();

    Ok(Selected {
        readable: pick(rlist, &readable),
        writable: pick(wlist, &writable),
        exceptional: Vec::new(),
    })
}

/// Converts a timeout in seconds, rejecting negative and NaN values.
pub(crate) fn seconds(timeout: f64) -> Result<Duration> {
    if timeout.is_nan() || timeout < 0.0 {
        return Err(Error::InvalidTimeout(timeout));
    }

    Ok(Duration::try_from_secs_f64(timeout).unwrap_or(Duration::MAX))
}

fn resolve<T: Fileno>(list: &[T]) -> Result<Vec<RawFd>> {
    list.iter().map(Fileno::fileno).collect()
}

fn pick<T: Clone>(list: &[T], positions: &[usize]) -> Vec<T> {
    positions.iter().filter_map(|&i| list.get(i).cloned()).collect()
}
