//! Synchronization primitives.
//!
//! These primitives suspend only the calling task, never the hub thread.
//!
//! The current primitives include:
//! - [`Event`] — a one-flag gate that tasks can wait on, with an optional
//!   timeout.

mod event;

pub use event::Event;
