//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the hub.
//! In particular, it exposes a generational [`Slab`] used to store I/O
//! watchers behind keys that stay safe to use after the watcher is gone.

mod slab;

pub(crate) use slab::{Key, Slab};
