//! The event loop behind the hub.
//!
//! The loop is responsible for:
//! - keeping I/O watchers and folding their interests into one poller
//!   registration per descriptor,
//! - managing timers,
//! - turning readiness into priority-ordered watcher firings.
//!
//! It lives inside the hub and is only ever touched from the hub thread,
//! through the thread-local context. Callbacks are run by the hub, never
//! by the loop itself.

mod core;
mod event;
mod poller;
mod timer;
mod watcher;

pub(crate) mod io;

pub(crate) use self::core::{Firing, Loop, MAXPRI};
pub(crate) use poller::Notifier;
pub(crate) use watcher::{IoWatcher, close as close_watcher};
