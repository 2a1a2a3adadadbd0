//! Asynchronous task primitives.
//!
//! This module defines the abstractions used by the hub to represent,
//! schedule, and execute asynchronous tasks.
//!
//! It includes:
//! - task state management,
//! - join handles for awaiting task completion or cancellation,
//! - the core task and runnable abstractions.
//!
//! Most users will interact with this module through [`spawn`] and
//! [`JoinHandle`], while the lower-level components are used internally
//! by the hub.

mod core;
mod handle;
mod state;

pub(crate) use self::core::{Runnable, Task, spawn_on};

pub use self::core::spawn;
pub use handle::{JoinError, JoinHandle};
