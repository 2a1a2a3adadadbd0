//! Core hub components.
//!
//! This module contains the building blocks of the hub: task execution,
//! the run queue, the thread-local context and cooperative yielding.
//!
//! It is responsible for:
//! - executing asynchronous tasks on the current thread,
//! - interleaving task batches with loop turns,
//! - providing the hub context to watchers and timers,
//! - enabling cooperative multitasking via yielding.

mod core;
mod queue;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::{Hub, active_watchers};
