use super::Hub;

use std::io;

/// Default number of readiness events fetched per poll.
const DEFAULT_EVENTS_CAPACITY: usize = 64;

/// Builder for configuring and creating a hub.
///
/// `HubBuilder` allows customizing hub parameters before constructing it.
///
/// # Examples
///
/// ```rust,ignore
/// let hub = HubBuilder::new()
///     .events_capacity(256)
///     .name("acceptor")
///     .build()?;
/// ```
pub struct HubBuilder {
    /// Poller event buffer size.
    events_capacity: usize,

    /// Name used in log lines.
    name: Option<String>,
}

impl HubBuilder {
    /// Creates a new `HubBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            name: None,
        }
    }

    /// Sets how many readiness events one loop turn can fetch.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn events_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "events_capacity must be > 0");

        self.events_capacity = n;
        self
    }

    /// Names the hub. The name only appears in log lines.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the hub with the configured options.
    ///
    /// This creates the poller and its notifier, which can fail if the
    /// process runs out of descriptors.
    pub fn build(self) -> io::Result<Hub> {
        Hub::new(self.events_capacity, self.name)
    }
}

impl Default for HubBuilder {
    /// Creates a default `HubBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
