//! Platform-specific I/O poller abstraction.
//!
//! This module provides a unified interface over platform-specific
//! readiness mechanisms (`epoll` on Linux, `poll(2)` elsewhere).
//!
//! The poller is used by the loop to:
//! - wait for I/O readiness on watched descriptors,
//! - wake up when a task is scheduled from another thread,
//! - sleep until the next timer deadline.
//!
//! The concrete implementation is selected at compile time
//! depending on the target operating system.

pub(crate) mod common;

pub(crate) use common::{Interest, Notifier};

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
mod poll;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
pub(crate) type Poller = poll::PollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;

use std::time::Duration;

/// Converts an optional poll timeout to milliseconds, rounding up so that
/// a sub-millisecond deadline never turns into a busy loop.
pub(crate) fn timeout_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(t) => t.as_nanos().div_ceil(1_000_000).min(i32::MAX as u128) as i32,
    }
}
