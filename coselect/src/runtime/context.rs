use super::queue::RunQueue;
use super::task::Runnable;
use crate::reactor::Loop;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Weak};

/// State of a hub shared with the tasks and watchers running on it.
pub(crate) struct HubShared {
    /// The event loop.
    pub(crate) core: RefCell<Loop>,

    /// Tasks ready to be polled.
    pub(crate) queue: Arc<RunQueue>,

    /// Every task spawned on the hub, so they can be cancelled when the
    /// hub is dropped.
    pub(crate) tasks: RefCell<Vec<Weak<dyn Runnable>>>,
}

thread_local! {
    /// Thread-local handle to the hub currently driving this thread.
    ///
    /// This is set while a hub runs (or tears down) and allows watchers,
    /// timers and `spawn` to reach the loop without explicit parameter
    /// passing.
    static CURRENT_HUB: RefCell<Option<Rc<HubShared>>> = const { RefCell::new(None) };
}

/// Restores the previous context when dropped, including on unwind.
struct ContextGuard {
    prev: Option<Rc<HubShared>>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT_HUB.with(|cell| *cell.borrow_mut() = prev);
    }
}

/// Enters the hub execution context for the current thread.
///
/// The hub is installed for the duration of the closure `f`; the previous
/// context is restored afterwards, even if `f` panics.
pub(crate) fn enter_context<R>(hub: Rc<HubShared>, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_HUB.with(|cell| cell.borrow_mut().replace(hub));
    let _guard = ContextGuard { prev };

    f()
}

/// Returns `true` if a hub is running on this thread.
pub(crate) fn is_entered() -> bool {
    CURRENT_HUB.with(|cell| cell.borrow().is_some())
}

/// Returns the current hub.
///
/// # Panics
///
/// Panics if called outside of a hub.
pub(crate) fn current() -> Rc<HubShared> {
    CURRENT_HUB.with(|cell| {
        cell.borrow()
            .as_ref()
            .expect("must be called within the context of a hub")
            .clone()
    })
}

/// Runs `f` with the current hub's loop.
///
/// # Panics
///
/// Panics if called outside of a hub, or re-entrantly from inside the loop.
pub(crate) fn with_loop<R>(f: impl FnOnce(&mut Loop) -> R) -> R {
    let hub = current();
    let mut core = hub.core.borrow_mut();

    f(&mut core)
}

/// Like [`with_loop`], but returns `None` instead of panicking when there
/// is no hub or the loop is already borrowed. Used on drop paths.
pub(crate) fn try_with_loop<R>(f: impl FnOnce(&mut Loop) -> R) -> Option<R> {
    let hub = CURRENT_HUB
        .try_with(|cell| cell.try_borrow().ok().and_then(|hub| hub.clone()))
        .ok()
        .flatten()?;

    let mut core = hub.core.try_borrow_mut().ok()?;

    Some(f(&mut core))
}
