use super::task::Runnable;
use crate::reactor::Notifier;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

/// Run queue of a hub.
///
/// Tasks are pushed here when they are spawned or woken. Wakers may fire
/// from any thread; a push from a thread other than the hub's interrupts
/// the poller so the hub notices the new work.
pub(crate) struct RunQueue {
    /// Tasks waiting to be polled, in wake order.
    queue: Mutex<VecDeque<Arc<dyn Runnable>>>,

    /// Thread driving the hub.
    owner: ThreadId,

    /// Interrupts a blocking loop turn.
    notifier: Arc<Notifier>,
}

impl RunQueue {
    /// Creates an empty run queue owned by the calling thread.
    pub(crate) fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            owner: thread::current().id(),
            notifier,
        }
    }

    /// Pushes a task to the back of the queue.
    pub(crate) fn push(&self, task: Arc<dyn Runnable>) {
        self.queue.lock().unwrap().push_back(task);

        if thread::current().id() != self.owner {
            self.notifier.notify();
        }
    }

    /// Takes the task at the front of the queue.
    pub(crate) fn pop(&self) -> Option<Arc<dyn Runnable>> {
        self.queue.lock().unwrap().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }

    /// Empties the queue.
    pub(crate) fn drain(&self) -> Vec<Arc<dyn Runnable>> {
        self.queue.lock().unwrap().drain(..).collect()
    }
}
