//! # coselect
//!
//! **coselect** provides cooperative replacements for the blocking `select()`
//! and `poll()` primitives. Instead of blocking the thread, they block only
//! the calling task: readiness is waited for with I/O watchers on a
//! single-threaded event loop (the *hub*), and every other task keeps running
//! meanwhile.
//!
//! The crate ships the small runtime it needs:
//!
//! - A **hub** that runs tasks cooperatively on the current thread and
//!   interleaves them with turns of its event loop (`epoll` on Linux,
//!   `poll(2)` on other Unix systems)
//! - **Timer primitives**: sleep and timeout
//! - A cooperative **event** for waiting between tasks
//! - **Macros** `#[coselect::main]` and `#[coselect::test]`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use coselect::{POLLIN, Poll};
//! use std::os::unix::net::UnixStream;
//!
//! #[coselect::main]
//! async fn main() {
//!     let (reader, writer) = UnixStream::pair().unwrap();
//!
//!     // Wait up to one second for `reader` to become readable.
//!     let ready = coselect::select(&[&reader], &[], &[], Some(1.0)).await.unwrap();
//!     assert!(ready.readable.is_empty());
//!
//!     let mut poll = Poll::new();
//!     poll.register(&reader, Some(POLLIN)).unwrap();
//!     drop(writer);
//!
//!     // Milliseconds here, as with poll(2).
//!     let events = poll.poll(Some(1000.0)).await.unwrap();
//!     assert_eq!(events.len(), 1);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`task`] — Spawning tasks and join handles
//! - [`time`] — Sleep and timeout
//! - [`sync`] — Cooperative event

mod error;
mod reactor;
mod runtime;
mod select;
mod utils;

pub mod sync;
pub mod time;

pub use error::{Error, Result};
pub use runtime::builder::HubBuilder;
pub use runtime::task;
pub use runtime::yield_now::yield_now;
pub use runtime::{Hub, active_watchers};
pub use select::{
    Fileno, POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, POLLPRI, POLLRDBAND, POLLRDNORM,
    POLLWRBAND, POLLWRNORM, Poll, PollFlags, Selected, select,
};

pub use coselect_macros::*;
