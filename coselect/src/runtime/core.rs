use super::context::{self, HubShared};
use super::queue::RunQueue;
use super::task::{JoinHandle, spawn_on};
use crate::reactor::{Firing, Loop};

use log::debug;
use std::cell::RefCell;
use std::future::Future;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Weak, mpsc};
use std::time::Duration;

/// The hub: a single-threaded executor driving one event loop.
///
/// `Hub` is responsible for:
/// - spawning asynchronous tasks,
/// - polling them cooperatively on the current thread,
/// - running the loop between two batches of tasks so that I/O watchers
///   and timers fire,
/// - providing a synchronous entry point via [`block_on`](Self::block_on).
///
/// A hub is bound to the thread that built it. Dropping the hub aborts
/// every task still alive and releases all watchers and timers.
pub struct Hub {
    shared: Rc<HubShared>,
    name: Option<String>,
}

impl Hub {
    /// Creates a new hub.
    ///
    /// # Arguments
    ///
    /// * `events_capacity` - Number of readiness events fetched per poll.
    /// * `name` - Optional name used in log lines.
    pub(crate) fn new(events_capacity: usize, name: Option<String>) -> io::Result<Self> {
        let core = Loop::new(events_capacity)?;
        let queue = Arc::new(RunQueue::new(core.notifier()));

        debug!(
            "hub {} started (events capacity {events_capacity})",
            name.as_deref().unwrap_or("<unnamed>")
        );

        Ok(Self {
            shared: Rc::new(HubShared {
                core: RefCell::new(core),
                queue,
                tasks: RefCell::new(Vec::new()),
            }),
            name,
        })
    }

    /// Spawns a future onto the hub.
    ///
    /// The future starts running once the hub is driven by
    /// [`block_on`](Self::block_on).
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = hub.spawn(async { 1 + 1 });
    /// assert_eq!(hub.block_on(handle).unwrap(), 2);
    /// ```
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        spawn_on(&self.shared, future)
    }

    /// Number of I/O watchers currently alive in the hub's loop.
    pub fn active_watchers(&self) -> usize {
        self.shared.core.borrow().active_watchers()
    }

    /// Runs a future to completion, blocking the current thread.
    ///
    /// This method is typically used as the synchronous entry point
    /// of the hub (e.g. in `main` or tests). Other spawned tasks make
    /// progress while the future is pending.
    ///
    /// Internally, the future is spawned onto the hub and its result is
    /// sent back through a channel.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a hub, or if the poller fails.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = hub.block_on(async {
    ///     42
    /// });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        assert!(
            !context::is_entered(),
            "cannot block_on a hub from within a hub"
        );

        let (transmitter, receiver) = mpsc::channel();

        self.spawn(async move {
            let result = future.await;
            let _ = transmitter.send(result);
        });

        context::enter_context(self.shared.clone(), || self.run_until(&receiver))
    }

    fn run_until<T>(&self, receiver: &mpsc::Receiver<T>) -> T {
        loop {
            if let Ok(value) = receiver.try_recv() {
                return value;
            }

            // Only the tasks queued now; anything they wake waits for the
            // next iteration, after the loop had its turn.
            let batch = self.shared.queue.len();
            for _ in 0..batch {
                match self.shared.queue.pop() {
                    Some(task) => task.run(),
                    None => break,
                }
            }

            if let Ok(value) = receiver.try_recv() {
                return value;
            }

            self.turn();
        }
    }

    /// Runs one loop turn and dispatches the watchers that fired.
    fn turn(&self) {
        let firings = {
            let mut core = self.shared.core.borrow_mut();

            let timeout = if self.shared.queue.is_empty() {
                core.next_timeout()
            } else {
                Some(Duration::ZERO)
            };

            core.turn(timeout)
        };

        let firings = firings.unwrap_or_else(|err| {
            panic!("hub {} poller failed: {err}", self.display_name())
        });

        for firing in firings {
            self.dispatch(firing);
        }
    }

    fn dispatch(&self, firing: Firing) {
        let Some(mut callback) = self.shared.core.borrow_mut().take_callback(firing.key) else {
            // Stopped or closed by an earlier callback of this turn.
            return;
        };

        callback(firing.revents);

        let leftover = self
            .shared
            .core
            .borrow_mut()
            .restore_callback(firing.key, callback);
        drop(leftover);
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl Drop for Hub {
    /// Shuts down the hub.
    ///
    /// This performs the following steps:
    /// 1. Aborts every live task, dropping its future inside the hub context
    /// 2. Empties the run queue
    /// 3. Releases the remaining watchers and timers
    fn drop(&mut self) {
        let shared = self.shared.clone();

        context::enter_context(self.shared.clone(), || {
            let tasks = std::mem::take(&mut *shared.tasks.borrow_mut());
            for task in tasks.iter().filter_map(Weak::upgrade) {
                task.cancel();
            }

            drop(shared.queue.drain());

            let released = shared.core.borrow_mut().shutdown();
            drop(released);
        });

        debug!("hub {} shut down", self.display_name());
    }
}

/// Number of I/O watchers alive in the current hub.
///
/// # Panics
///
/// Panics if called outside of a hub.
pub fn active_watchers() -> usize {
    context::with_loop(|lp| lp.active_watchers())
}
