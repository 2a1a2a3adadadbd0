use crate::reactor::close_watcher;
use crate::reactor::io::Revents;
use crate::sync::Event;
use crate::utils::Key;

use std::sync::{Arc, Mutex};

/// Which result list a watcher reports into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum List {
    Read,
    Write,
}

#[derive(Default)]
struct Lists {
    read: Vec<usize>,
    write: Vec<usize>,
    error: Vec<usize>,
}

/// Where the watchers of one `select` call report readiness.
///
/// Lists hold positions into the caller's input slices, appended in the
/// order the callbacks fire. The event is set by the first callback.
#[derive(Clone)]
pub(crate) struct ReadySet {
    lists: Arc<Mutex<Lists>>,
    event: Event,
}

impl ReadySet {
    pub(crate) fn new() -> Self {
        Self {
            lists: Arc::new(Mutex::new(Lists::default())),
            event: Event::new(),
        }
    }

    pub(crate) fn event(&self) -> &Event {
        &self.event
    }

    /// Builds the callback for the watcher `key` watching `list[index]`.
    ///
    /// The callback records the index, closes its own watcher so it fires
    /// at most once, and sets the event.
    pub(crate) fn callback(
        &self,
        list: List,
        index: usize,
        key: Key,
    ) -> impl FnMut(Revents) + 'static + use<> {
        let ready = self.clone();

        move |_revents| {
            {
                let mut lists = ready.lists.lock().unwrap();
                match list {
                    List::Read => lists.read.push(index),
                    List::Write => lists.write.push(index),
                }
            }

            close_watcher(key);
            ready.event.set();
        }
    }

    /// The collected `(read, write, error)` positions.
    pub(crate) fn take(&self) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
        let mut lists = self.lists.lock().unwrap();

        (
            std::mem::take(&mut lists.read),
            std::mem::take(&mut lists.write),
            std::mem::take(&mut lists.error),
        )
    }
}
