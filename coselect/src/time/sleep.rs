use crate::runtime::context;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Stand-in deadline for durations that overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Suspends the calling task for `duration`.
///
/// Only the task sleeps: the hub keeps running other tasks and turning its
/// loop until the deadline passes.
///
/// # Panics
///
/// Panics if polled outside of a hub.
///
/// # Examples
///
/// ```rust,ignore
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    let now = Instant::now();

    sleep_until(now.checked_add(duration).unwrap_or(now + FAR_FUTURE))
}

/// Suspends the calling task until `deadline`.
///
/// A deadline in the past completes on the first poll without touching
/// the loop.
pub fn sleep_until(deadline: Instant) -> Sleep {
    Sleep {
        deadline,
        timer: None,
    }
}

/// Future returned by [`sleep`] and [`sleep_until`].
///
/// The loop timer is armed on the first pending poll and disarmed when the
/// future is dropped, so an abandoned `Sleep` never wakes its task.
pub struct Sleep {
    deadline: Instant,

    /// Cancellation flag of the armed loop timer.
    timer: Option<Arc<AtomicBool>>,
}

impl Sleep {
    /// The instant at which the sleep completes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    fn arm(&mut self, cx: &Context<'_>) {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (deadline, waker) = (self.deadline, cx.waker().clone());

        context::with_loop(|lp| lp.add_timer(deadline, waker, cancelled.clone()));
        self.timer = Some(cancelled);
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if Instant::now() >= this.deadline {
            return Poll::Ready(());
        }

        if this.timer.is_none() {
            this.arm(cx);
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let Some(cancelled) = &self.timer {
            cancelled.store(true, Ordering::Release);
        }
    }
}
