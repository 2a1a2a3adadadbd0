use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that yields execution back to the hub exactly once.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    /// Polls the yield future.
    ///
    /// On the first poll, the task reschedules itself and returns
    /// `Poll::Pending`. Because the hub runs one loop turn between two
    /// batches of tasks, pending I/O callbacks get a chance to run before
    /// the second poll, which completes the future.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.0 {
            self.0 = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        Poll::Ready(())
    }
}

/// Yields execution back to the hub.
///
/// This allows other tasks and ready I/O watchers to make progress before
/// the current task continues. The function yields exactly once.
///
/// # Examples
///
/// ```rust,ignore
/// async fn task() {
///     // Allow other tasks to run
///     coselect::yield_now().await;
/// }
/// ```
pub async fn yield_now() {
    YieldOnce(false).await
}
