use super::JoinHandle;
use super::state::{ABORTED, CANCELLED, COMPLETED, IDLE, NOTIFIED, QUEUED, RUNNING};
use crate::runtime::context::{self, HubShared};
use crate::runtime::queue::RunQueue;

use std::cell::UnsafeCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A runnable unit of work that can be executed by the hub.
///
/// The `Runnable` trait abstracts the specific return type of a task,
/// allowing the hub to manage a heterogeneous collection of tasks
/// through `Arc<dyn Runnable>`.
pub(crate) trait Runnable: Send + Sync {
    /// Polls the task once, or drops its future if it was aborted.
    fn run(self: Arc<Self>);

    /// Drops the task's future right away. Used when the hub shuts down.
    fn cancel(&self);
}

/// A spawned asynchronous task managed by the hub.
///
/// A `Task` acts as the container for a `Future`. It coordinates the lifecycle
/// of that future, including its execution state, waker registration,
/// and result storage.
pub(crate) struct Task<T> {
    /// The underlying future, `None` once it completed or was aborted.
    ///
    /// Only the hub thread touches it, while the task is `RUNNING` or while
    /// the hub shuts down.
    future: UnsafeCell<Option<BoxFuture<T>>>,

    /// Storage for the result produced by the future upon completion.
    pub(crate) result: UnsafeCell<Option<T>>,

    /// The current lifecycle state of the task (IDLE, RUNNING, etc.).
    pub(crate) state: AtomicUsize,

    /// Run queue of the hub the task belongs to.
    queue: Arc<RunQueue>,

    /// A list of wakers belonging to `JoinHandle`s awaiting this task.
    pub(crate) waiters: Mutex<Vec<Waker>>,
}

unsafe impl<T> Send for Task<T> {}
unsafe impl<T> Sync for Task<T> {}

impl<T: Send + 'static> Task<T> {
    /// Creates a new task instance from a future.
    ///
    /// The task is initialized in the `QUEUED` state, indicating it is ready
    /// to be processed by the hub.
    pub(crate) fn new<F>(future: F, queue: Arc<RunQueue>) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: UnsafeCell::new(Some(Box::pin(future))),
            result: UnsafeCell::new(None),
            state: AtomicUsize::new(QUEUED),
            queue,
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Performs the execution of the task.
    ///
    /// This method transitions the task to `RUNNING`, polls the inner future,
    /// and handles the resulting `Poll` state:
    /// - `Poll::Pending`: Transitions back to `IDLE`, re-queues if notified,
    ///   or drops the future if an abort arrived meanwhile.
    /// - `Poll::Ready`: Stores the result and notifies all `JoinHandle` waiters.
    pub(crate) fn run(self: Arc<Self>) {
        let current = self.state.load(Ordering::Acquire);

        if current == CANCELLED {
            if self
                .state
                .compare_exchange(CANCELLED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.release();
            }
            return;
        }

        if current != QUEUED && current != NOTIFIED {
            return;
        }

        // Transition to RUNNING. This ensures exclusive access to the UnsafeCell.
        if self
            .state
            .compare_exchange(current, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let waker = Waker::from(self.clone());
        let mut cx = Context::from_waker(&waker);

        // Safety: The RUNNING state guarantees that nothing else touches the future.
        let poll = match unsafe { &mut *self.future.get() } {
            Some(future) => future.as_mut().poll(&mut cx),
            None => return,
        };

        match poll {
            Poll::Pending => loop {
                match self.state.compare_exchange(
                    RUNNING,
                    IDLE,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return,
                    Err(NOTIFIED) => {
                        // Woken while running; move back to QUEUED and reschedule.
                        if self
                            .state
                            .compare_exchange(NOTIFIED, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                        {
                            self.queue.push(self.clone());
                            return;
                        }
                    }
                    Err(CANCELLED) => {
                        self.release();
                        return;
                    }
                    Err(_) => return,
                }
            },
            Poll::Ready(val) => {
                // Safety: still RUNNING, see above.
                unsafe {
                    *self.result.get() = Some(val);
                    *self.future.get() = None;
                }
                self.state.store(COMPLETED, Ordering::Release);

                self.wake_waiters();
            }
        }
    }

    /// Signals the task to be rescheduled.
    ///
    /// If the task is `IDLE`, it moves to `QUEUED` and is pushed to the run
    /// queue. If the task is `RUNNING`, it moves to `NOTIFIED` to ensure it
    /// is re-polled after its current execution slice.
    fn schedule(self: Arc<Self>) {
        loop {
            let state = self.state.load(Ordering::Acquire);

            match state {
                IDLE => {
                    if self
                        .state
                        .compare_exchange(IDLE, QUEUED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.queue.push(self.clone());
                        return;
                    }
                }
                RUNNING => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                // Queued, notified, finished or being aborted: nothing to do.
                _ => return,
            }
        }
    }

    /// Requests the task to be aborted.
    ///
    /// The future is not dropped here: the task moves to `CANCELLED` and
    /// the hub drops the future the next time it reaches the task. Waiters
    /// are woken once that happened.
    pub(crate) fn abort(self: &Arc<Self>) {
        loop {
            let state = self.state.load(Ordering::Acquire);

            if matches!(state, COMPLETED | CANCELLED | ABORTED) {
                return;
            }

            if self
                .state
                .compare_exchange(state, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                // A queued task is already in the run queue; a running one
                // is released when its poll returns.
                if state == IDLE {
                    self.queue.push(self.clone());
                }
                return;
            }
        }
    }

    /// Drops the future and reports the task as aborted.
    fn release(&self) {
        // Safety: callers hold the task in RUNNING, or the hub is shutting
        // down and no task is being polled.
        let future = unsafe { (*self.future.get()).take() };
        drop(future);

        self.state.store(ABORTED, Ordering::Release);
        self.wake_waiters();
    }

    fn wake_waiters(&self) {
        let waiters = std::mem::take(&mut *self.waiters.lock().unwrap());

        for w in waiters {
            w.wake();
        }
    }
}

impl<T: Send + 'static> Wake for Task<T> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.clone().schedule();
    }
}

impl<T: Send + 'static> Runnable for Task<T> {
    fn run(self: Arc<Self>) {
        Task::run(self)
    }

    fn cancel(&self) {
        let state = self.state.load(Ordering::Acquire);

        if matches!(state, RUNNING | COMPLETED | ABORTED) {
            return;
        }

        self.release();
    }
}

/// Creates a task on `hub` and queues it.
pub(crate) fn spawn_on<F, T>(hub: &HubShared, future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let task = Arc::new(Task::new(future, hub.queue.clone()));

    let mut tasks = hub.tasks.borrow_mut();
    tasks.retain(|t| t.strong_count() > 0);

    let runnable: Arc<dyn Runnable> = task.clone();
    tasks.push(Arc::downgrade(&runnable));
    drop(tasks);

    hub.queue.push(runnable);

    JoinHandle { task }
}

/// Spawns a future as a task onto the current hub.
///
/// The task starts running once the hub reaches it in its run queue. The
/// returned [`JoinHandle`] resolves to the task's output, or to
/// [`JoinError::Cancelled`](super::JoinError::Cancelled) if the task was
/// aborted.
///
/// # Panics
///
/// Panics if called outside the context of a hub.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let hub = context::current();

    spawn_on(&hub, future)
}
