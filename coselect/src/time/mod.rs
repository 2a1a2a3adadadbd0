//! Time utilities.
//!
//! This module provides time-related asynchronous utilities that
//! integrate with the hub's loop.
//!
//! It includes:
//! - [`sleep`] and [`sleep_until`] for suspending a task,
//! - [`timeout`] for bounding future execution time.

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{Sleep, sleep, sleep_until};

#[doc(inline)]
pub use timeout::{Elapsed, Timeout, timeout};
