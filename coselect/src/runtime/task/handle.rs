use super::Task;
use super::state::{ABORTED, COMPLETED};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};

use thiserror::Error;

/// Reason a [`JoinHandle`] did not produce the task's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The task was aborted before it completed. Its future has been
    /// dropped.
    #[error("task was cancelled")]
    Cancelled,
}

/// A handle to a spawned task.
///
/// A `JoinHandle` allows awaiting the result of a task spawned onto
/// the hub. It implements [`Future`] and resolves once the task
/// has completed or has been aborted.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
pub struct JoinHandle<T> {
    /// Shared reference to the underlying task.
    pub(crate) task: Arc<Task<T>>,
}

impl<T: Send + 'static> JoinHandle<T> {
    /// Aborts the task.
    ///
    /// The task's future is dropped on the hub thread the next time the hub
    /// runs, which runs every destructor it holds. Awaiting the handle then
    /// yields [`JoinError::Cancelled`]. Aborting a finished task does
    /// nothing.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Returns `true` once the task completed or its abort took effect.
    pub fn is_finished(&self) -> bool {
        matches!(self.task.state.load(Ordering::Acquire), COMPLETED | ABORTED)
    }
}

impl<T> JoinHandle<T> {
    fn try_take(&self) -> Option<Result<T, JoinError>> {
        match self.task.state.load(Ordering::Acquire) {
            COMPLETED => {
                let value = unsafe {
                    (*self.task.result.get())
                        .take()
                        .expect("result already taken")
                };
                Some(Ok(value))
            }
            ABORTED => Some(Err(JoinError::Cancelled)),
            _ => None,
        }
    }
}

impl<T> Future for JoinHandle<T> {
    /// The output of the spawned task, or why there is none.
    type Output = Result<T, JoinError>;

    /// Polls the join handle.
    ///
    /// If the task has already finished, its outcome is returned
    /// immediately. Otherwise, the current waker is registered and
    /// the future returns `Poll::Pending`.
    ///
    /// The waker is registered **before** re-checking the task state
    /// to avoid missed wake-ups.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.try_take() {
            return Poll::Ready(outcome);
        }

        self.task.waiters.lock().unwrap().push(cx.waker().clone());

        if let Some(outcome) = self.try_take() {
            return Poll::Ready(outcome);
        }

        Poll::Pending
    }
}
