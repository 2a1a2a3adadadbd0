use crate::runtime::yield_now::yield_now;
use crate::time;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

struct Inner {
    flag: AtomicBool,
    waiters: Mutex<Vec<Waker>>,
}

/// A cooperative event.
///
/// An `Event` holds a boolean flag. Tasks calling [`wait`](Self::wait) are
/// suspended until another task (or a watcher callback, or another thread)
/// calls [`set`](Self::set). Clones share the same flag.
///
/// # Examples
///
/// ```rust,ignore
/// let event = Event::new();
/// let setter = event.clone();
///
/// coselect::task::spawn(async move { setter.set() });
///
/// assert!(event.wait(None).await);
/// ```
#[derive(Clone)]
pub struct Event {
    inner: Arc<Inner>,
}

impl Event {
    /// Creates an unset event.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                waiters: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Sets the flag and wakes every waiting task.
    pub fn set(&self) {
        self.inner.flag.store(true, Ordering::Release);

        let waiters = std::mem::take(&mut *self.inner.waiters.lock().unwrap());
        for w in waiters {
            w.wake();
        }
    }

    /// Resets the flag. Tasks already woken are not affected.
    pub fn clear(&self) {
        self.inner.flag.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
    }

    /// Waits until the flag is set, or until `timeout` elapses.
    ///
    /// Returns the flag as observed when the wait ends, so `false` means
    /// the timeout expired first. A zero timeout still yields to the hub
    /// once, giving ready watchers a chance to set the flag.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        if self.is_set() {
            return true;
        }

        match timeout {
            None => {
                WaitSet { event: self }.await;
                true
            }
            Some(d) if d.is_zero() => {
                yield_now().await;
                self.is_set()
            }
            Some(d) => match time::timeout(d, WaitSet { event: self }).await {
                Ok(()) => true,
                Err(_) => self.is_set(),
            },
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event").field("set", &self.is_set()).finish()
    }
}

/// Resolves once the event is set.
struct WaitSet<'a> {
    event: &'a Event,
}

impl Future for WaitSet<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.event.is_set() {
            return Poll::Ready(());
        }

        {
            let mut waiters = self.event.inner.waiters.lock().unwrap();
            if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                waiters.push(cx.waker().clone());
            }
        }

        if self.event.is_set() {
            return Poll::Ready(());
        }

        Poll::Pending
    }
}
