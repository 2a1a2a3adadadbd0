use super::event::Event;
use super::io::{Callback, EvFlags, FdState, IoEntry, Revents};
use super::poller::platform::sys_check_fd;
use super::poller::{Interest, Notifier, Poller};
use super::timer::TimerEntry;
use crate::utils::{Key, Slab};

use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Waker;
use std::time::{Duration, Instant};

/// Lowest watcher priority.
pub(crate) const MINPRI: i8 = -2;

/// Highest watcher priority.
pub(crate) const MAXPRI: i8 = 2;

/// A watcher due to have its callback invoked.
pub(crate) struct Firing {
    pub(crate) key: Key,
    pub(crate) priority: i8,
    pub(crate) revents: Revents,
}

/// The event loop owned by a hub.
///
/// The loop keeps every I/O watcher, aggregates their interests per
/// descriptor into a single poller registration, runs timers, and turns
/// readiness into priority-ordered [`Firing`]s. It never invokes
/// callbacks itself: the hub takes each callback out with
/// [`take_callback`](Self::take_callback), runs it with no loop borrow
/// held, and hands it back with [`restore_callback`](Self::restore_callback).
pub(crate) struct Loop {
    poller: Poller,
    events: Vec<Event>,

    timers: BinaryHeap<TimerEntry>,
    timer_seq: u64,

    watchers: Slab<IoEntry>,
    fds: HashMap<RawFd, FdState>,

    /// Synthetic deliveries queued outside of a poll.
    fed: Vec<(Key, Revents)>,
}

impl Loop {
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self {
            poller: Poller::new(capacity)?,
            events: Vec::with_capacity(capacity),
            timers: BinaryHeap::new(),
            timer_seq: 0,
            watchers: Slab::new(capacity),
            fds: HashMap::new(),
            fed: Vec::new(),
        })
    }

    pub(crate) fn notifier(&self) -> Arc<Notifier> {
        self.poller.notifier()
    }

    /// Creates a stopped watcher for `fd`.
    pub(crate) fn io(&mut self, fd: RawFd, events: EvFlags) -> io::Result<Key> {
        if fd < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("fd must be non-negative: {fd}"),
            ));
        }

        Ok(self.watchers.insert(IoEntry {
            fd,
            events,
            priority: 0,
            started: false,
            callback: None,
        }))
    }

    /// Sets the priority of a watcher, clamped to `MINPRI..=MAXPRI`.
    pub(crate) fn set_priority(&mut self, key: Key, priority: i8) {
        if let Some(entry) = self.watchers.get_mut(key) {
            entry.priority = priority.clamp(MINPRI, MAXPRI);
        }
    }

    /// Attaches `callback` to a watcher and starts it.
    ///
    /// Starting an already started watcher only replaces its callback.
    pub(crate) fn start(&mut self, key: Key, callback: Callback) {
        let Some(entry) = self.watchers.get_mut(key) else {
            return;
        };

        entry.callback = Some(callback);

        if entry.started {
            return;
        }

        entry.started = true;
        let fd = entry.fd;
        trace!("io watcher {key:?} started on fd {fd} ({:?})", entry.events);

        self.fds.entry(fd).or_default().watchers.push(key);
        self.sync_fd(fd);
    }

    /// Detaches a watcher from its descriptor. The callback is kept.
    pub(crate) fn stop(&mut self, key: Key) {
        let Some(entry) = self.watchers.get_mut(key) else {
            return;
        };

        if !entry.started {
            return;
        }

        entry.started = false;
        let fd = entry.fd;
        trace!("io watcher {key:?} stopped on fd {fd}");

        if let Some(state) = self.fds.get_mut(&fd) {
            state.watchers.retain(|k| *k != key);
        }

        self.fed.retain(|(k, _)| *k != key);
        self.sync_fd(fd);
    }

    /// Stops and releases a watcher.
    ///
    /// The removed entry is returned so the caller can drop its callback
    /// once the loop is no longer borrowed. Closing a closed watcher is a
    /// no-op.
    pub(crate) fn close(&mut self, key: Key) -> Option<IoEntry> {
        self.stop(key);

        let entry = self.watchers.remove(key)?;
        trace!("io watcher {key:?} closed");

        Some(entry)
    }

    /// Number of watchers that exist (started or not).
    pub(crate) fn active_watchers(&self) -> usize {
        self.watchers.len()
    }

    /// Schedules `waker` to be woken at `deadline`.
    pub(crate) fn add_timer(
        &mut self,
        deadline: Instant,
        waker: Waker,
        cancelled: Arc<AtomicBool>,
    ) {
        self.timer_seq += 1;

        self.timers.push(TimerEntry {
            deadline,
            seq: self.timer_seq,
            waker,
            cancelled,
        });
    }

    /// How long the next turn may block.
    ///
    /// `None` means "until an I/O event". Pending synthetic deliveries and
    /// descriptors that are always ready force a zero timeout.
    pub(crate) fn next_timeout(&mut self) -> Option<Duration> {
        if !self.fed.is_empty() || self.has_always_ready() {
            return Some(Duration::ZERO);
        }

        while let Some(timer) = self.timers.peek() {
            if timer.cancelled.load(Ordering::Acquire) {
                self.timers.pop();
                continue;
            }

            return Some(timer.deadline.saturating_duration_since(Instant::now()));
        }

        None
    }

    /// Runs one loop turn.
    ///
    /// Waits for I/O for at most `timeout`, wakes expired timers, and
    /// returns the watchers to dispatch, highest priority first. Within a
    /// priority, poller readiness comes before fed deliveries.
    pub(crate) fn turn(&mut self, timeout: Option<Duration>) -> io::Result<Vec<Firing>> {
        let timeout = if !self.fed.is_empty() || self.has_always_ready() {
            Some(Duration::ZERO)
        } else {
            timeout
        };

        let mut events = std::mem::take(&mut self.events);
        let polled = self.poller.poll(&mut events, timeout);

        self.fire_timers();

        let mut firings = Vec::new();

        if polled.is_ok() {
            for event in &events {
                self.collect_event(event, &mut firings);
            }
        }

        events.clear();
        self.events = events;
        polled?;

        for (fd, state) in &self.fds {
            if !state.always_ready {
                continue;
            }

            for &key in &state.watchers {
                if let Some(entry) = self.watchers.get(key)
                    && entry.started
                    && !entry.events.is_empty()
                {
                    trace!("fd {fd} is always ready");
                    firings.push(Firing {
                        key,
                        priority: entry.priority,
                        revents: Revents::Ready(entry.events),
                    });
                }
            }
        }

        for (key, revents) in std::mem::take(&mut self.fed) {
            if let Some(entry) = self.watchers.get(key)
                && entry.started
            {
                firings.push(Firing {
                    key,
                    priority: entry.priority,
                    revents,
                });
            }
        }

        firings.sort_by_key(|f| Reverse(f.priority));

        Ok(firings)
    }

    /// Takes the callback of a started watcher so it can run unborrowed.
    pub(crate) fn take_callback(&mut self, key: Key) -> Option<Callback> {
        let entry = self.watchers.get_mut(key)?;

        if !entry.started {
            return None;
        }

        entry.callback.take()
    }

    /// Puts a callback back after it ran.
    ///
    /// If the callback closed its watcher or installed a new callback,
    /// it is handed back to the caller to be dropped.
    pub(crate) fn restore_callback(&mut self, key: Key, callback: Callback) -> Option<Callback> {
        match self.watchers.get_mut(key) {
            Some(entry) if entry.callback.is_none() => {
                entry.callback = Some(callback);
                None
            }
            _ => Some(callback),
        }
    }

    /// Releases every watcher and timer, returning them so that their
    /// callbacks and wakers are dropped outside of the loop borrow.
    pub(crate) fn shutdown(&mut self) -> (Vec<IoEntry>, Vec<TimerEntry>) {
        for fd in self.fds.keys().copied().collect::<Vec<_>>() {
            if let Some(state) = self.fds.remove(&fd)
                && state.registered.is_some()
            {
                let _ = self.poller.delete(fd);
            }
        }

        self.fed.clear();

        let watchers = self.watchers.drain();
        let timers = std::mem::take(&mut self.timers).into_vec();

        debug!(
            "loop shut down ({} watchers, {} timers released)",
            watchers.len(),
            timers.len()
        );

        (watchers, timers)
    }

    fn has_always_ready(&self) -> bool {
        self.fds.values().any(|state| {
            state.always_ready
                && state.watchers.iter().any(|&key| {
                    self.watchers
                        .get(key)
                        .is_some_and(|entry| !entry.events.is_empty())
                })
        })
    }

    fn fire_timers(&mut self) {
        let now = Instant::now();

        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now {
                break;
            }

            let Some(timer) = self.timers.pop() else {
                break;
            };

            if timer.cancelled.load(Ordering::Acquire) {
                continue;
            }

            timer.waker.wake();
        }
    }

    fn collect_event(&self, event: &Event, firings: &mut Vec<Firing>) {
        let Some(state) = self.fds.get(&event.fd) else {
            return;
        };

        let mut ready = EvFlags::empty();
        if event.readable {
            ready |= EvFlags::READ;
        }
        if event.writable {
            ready |= EvFlags::WRITE;
        }

        for &key in &state.watchers {
            let Some(entry) = self.watchers.get(key) else {
                continue;
            };

            if !entry.started {
                continue;
            }

            let revents = if event.invalid {
                Revents::Invalid
            } else {
                let hit = ready & entry.events;
                if hit.is_empty() {
                    continue;
                }
                Revents::Ready(hit)
            };

            firings.push(Firing {
                key,
                priority: entry.priority,
                revents,
            });
        }
    }

    /// Brings the poller registration of `fd` in line with the union of
    /// its started watchers.
    fn sync_fd(&mut self, fd: RawFd) {
        let Some(state) = self.fds.get_mut(&fd) else {
            return;
        };

        if state.watchers.is_empty() {
            if state.registered.is_some()
                && let Err(err) = self.poller.delete(fd)
            {
                // The descriptor may already be closed; the kernel dropped
                // the registration with it.
                trace!("fd {fd} deregistration failed: {err}");
            }

            self.fds.remove(&fd);
            return;
        }

        if state.always_ready {
            return;
        }

        let wanted = state
            .watchers
            .iter()
            .filter_map(|&key| self.watchers.get(key))
            .fold(EvFlags::empty(), |acc, entry| acc | entry.events);

        // Nothing to wait for, but the kernel would still report hang-up
        // and errors on a registration. Only validity is checked.
        if wanted.is_empty() {
            if state.registered.take().is_some()
                && let Err(err) = self.poller.delete(fd)
            {
                trace!("fd {fd} deregistration failed: {err}");
            }

            if let Err(err) = sys_check_fd(fd) {
                debug!("fd {fd} is not valid ({err}); reporting it invalid");

                for &key in &state.watchers {
                    if !self.fed.iter().any(|(k, _)| *k == key) {
                        self.fed.push((key, Revents::Invalid));
                    }
                }
            }

            return;
        }

        let wanted = Interest::from(wanted);

        let result = match state.registered {
            None => match self.poller.add(fd, wanted) {
                Err(err) if err.raw_os_error() == Some(libc::EEXIST) => {
                    self.poller.modify(fd, wanted)
                }
                other => other,
            },
            Some(current) if current == wanted => return,
            Some(_) => match self.poller.modify(fd, wanted) {
                Err(err) if err.raw_os_error() == Some(libc::ENOENT) => {
                    self.poller.add(fd, wanted)
                }
                other => other,
            },
        };

        match result {
            Ok(()) => state.registered = Some(wanted),
            Err(err) if err.raw_os_error() == Some(libc::EPERM) => {
                debug!("fd {fd} cannot be polled ({err}); treating it as always ready");
                state.registered = None;
                state.always_ready = true;
            }
            Err(err) => {
                debug!("fd {fd} rejected by the poller ({err}); reporting it invalid");
                state.registered = None;

                for &key in &state.watchers {
                    if !self.fed.iter().any(|(k, _)| *k == key) {
                        self.fed.push((key, Revents::Invalid));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::fs::File;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;
    use std::rc::Rc;
    use std::task::Wake;

    struct Flag(AtomicBool);

    impl Wake for Flag {
        fn wake(self: Arc<Self>) {
            self.0.store(true, Ordering::Release);
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<Revents>>>, Callback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |revents| sink.borrow_mut().push(revents)))
    }

    fn keys(firings: &[Firing]) -> Vec<Key> {
        firings.iter().map(|f| f.key).collect()
    }

    #[test]
    fn higher_priority_fires_first() {
        let mut lp = Loop::new(8).unwrap();
        let (a, _b) = UnixStream::pair().unwrap();

        let low = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        let high = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        lp.set_priority(low, MINPRI);
        lp.set_priority(high, MAXPRI);
        lp.start(low, Box::new(|_| {}));
        lp.start(high, Box::new(|_| {}));

        let firings = lp.turn(Some(Duration::from_secs(1))).unwrap();

        assert_eq!(keys(&firings), vec![high, low]);
    }

    #[test]
    fn priority_is_clamped() {
        let mut lp = Loop::new(8).unwrap();
        let (a, _b) = UnixStream::pair().unwrap();

        let key = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        lp.set_priority(key, 100);
        lp.start(key, Box::new(|_| {}));

        let firings = lp.turn(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(firings[0].priority, MAXPRI);
    }

    #[test]
    fn delivery_is_masked_by_interest() {
        let mut lp = Loop::new(8).unwrap();
        let (a, _b) = UnixStream::pair().unwrap();

        // Writable but not readable: only the write watcher fires.
        let reader = lp.io(a.as_raw_fd(), EvFlags::READ).unwrap();
        let writer = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        lp.start(reader, Box::new(|_| {}));
        lp.start(writer, Box::new(|_| {}));

        let firings = lp.turn(Some(Duration::from_secs(1))).unwrap();

        assert_eq!(keys(&firings), vec![writer]);
        assert_eq!(firings[0].revents, Revents::Ready(EvFlags::WRITE));
    }

    #[test]
    fn stopping_one_watcher_keeps_the_other() {
        let mut lp = Loop::new(8).unwrap();
        let (a, _b) = UnixStream::pair().unwrap();

        let first = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        let second = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        lp.start(first, Box::new(|_| {}));
        lp.start(second, Box::new(|_| {}));
        lp.stop(first);

        let firings = lp.turn(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(keys(&firings), vec![second]);
    }

    #[test]
    fn closed_descriptor_is_reported_invalid() {
        let mut lp = Loop::new(8).unwrap();

        let fd = {
            let (a, _b) = UnixStream::pair().unwrap();
            let high = unsafe { libc::fcntl(a.as_raw_fd(), libc::F_DUPFD_CLOEXEC, 800) };
            assert!(high >= 0);
            unsafe { libc::close(high) };
            high
        };

        let key = lp.io(fd, EvFlags::READ).unwrap();
        let (seen, callback) = recorder();
        lp.start(key, callback);

        let firings = lp.turn(None).unwrap();
        assert_eq!(keys(&firings), vec![key]);
        assert_eq!(firings[0].revents, Revents::Invalid);

        // epoll rejects the descriptor once; poll(2) keeps reporting it.
        #[cfg(any(target_os = "linux", target_os = "android"))]
        assert!(lp.turn(Some(Duration::ZERO)).unwrap().is_empty());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn regular_files_are_always_ready() {
        let mut lp = Loop::new(8).unwrap();
        let file = File::open("/dev/null").unwrap();

        let key = lp.io(file.as_raw_fd(), EvFlags::READ).unwrap();
        lp.start(key, Box::new(|_| {}));

        let firings = lp.turn(None).unwrap();
        assert_eq!(keys(&firings), vec![key]);
    }

    #[test]
    fn callbacks_are_taken_and_restored() {
        let mut lp = Loop::new(8).unwrap();
        let (a, _b) = UnixStream::pair().unwrap();

        let key = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        let (seen, callback) = recorder();
        lp.start(key, callback);

        let mut cb = lp.take_callback(key).unwrap();
        assert!(lp.take_callback(key).is_none());

        cb(Revents::Ready(EvFlags::WRITE));
        assert!(lp.restore_callback(key, cb).is_none());
        assert!(lp.take_callback(key).is_some());
        assert_eq!(seen.borrow().as_slice(), &[Revents::Ready(EvFlags::WRITE)]);
    }

    #[test]
    fn closing_releases_the_watcher_once() {
        let mut lp = Loop::new(8).unwrap();
        let (a, _b) = UnixStream::pair().unwrap();

        let key = lp.io(a.as_raw_fd(), EvFlags::WRITE).unwrap();
        lp.start(key, Box::new(|_| {}));
        assert_eq!(lp.active_watchers(), 1);

        let cb = lp.take_callback(key).unwrap();
        assert!(lp.close(key).is_some());
        assert!(lp.close(key).is_none());
        assert_eq!(lp.active_watchers(), 0);

        // The callback closed its own watcher: handed back for dropping.
        assert!(lp.restore_callback(key, cb).is_some());
        assert!(lp.turn(Some(Duration::ZERO)).unwrap().is_empty());
    }

    #[test]
    fn empty_interest_is_not_polled() {
        let mut lp = Loop::new(8).unwrap();
        let (a, b) = UnixStream::pair().unwrap();
        drop(b);

        let key = lp.io(a.as_raw_fd(), EvFlags::empty()).unwrap();
        lp.start(key, Box::new(|_| {}));

        // A hung-up peer must not make the turn return early.
        let start = Instant::now();
        let firings = lp.turn(Some(Duration::from_millis(100))).unwrap();

        assert!(firings.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[test]
    fn empty_interest_on_closed_descriptor_is_invalid() {
        let mut lp = Loop::new(8).unwrap();

        let fd = {
            let (a, _b) = UnixStream::pair().unwrap();
            let high = unsafe { libc::fcntl(a.as_raw_fd(), libc::F_DUPFD_CLOEXEC, 850) };
            assert!(high >= 0);
            unsafe { libc::close(high) };
            high
        };

        let key = lp.io(fd, EvFlags::empty()).unwrap();
        lp.start(key, Box::new(|_| {}));

        let firings = lp.turn(None).unwrap();
        assert_eq!(keys(&firings), vec![key]);
        assert_eq!(firings[0].revents, Revents::Invalid);
        assert!(lp.turn(Some(Duration::ZERO)).unwrap().is_empty());
    }

    #[test]
    fn negative_descriptor_is_rejected() {
        let mut lp = Loop::new(8).unwrap();

        let err = lp.io(-1, EvFlags::READ).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn expired_timers_wake_and_cancelled_ones_do_not() {
        let mut lp = Loop::new(8).unwrap();

        let fired = Arc::new(Flag(AtomicBool::new(false)));
        let skipped = Arc::new(Flag(AtomicBool::new(false)));
        let cancelled = Arc::new(AtomicBool::new(true));

        let deadline = Instant::now() + Duration::from_millis(20);
        lp.add_timer(deadline, Waker::from(fired.clone()), Arc::new(AtomicBool::new(false)));
        lp.add_timer(deadline, Waker::from(skipped.clone()), cancelled);

        let timeout = lp.next_timeout();
        assert!(timeout.is_some_and(|t| t <= Duration::from_millis(20)));

        lp.turn(timeout).unwrap();
        while Instant::now() < deadline {
            let timeout = lp.next_timeout();
            lp.turn(timeout).unwrap();
        }
        lp.turn(Some(Duration::ZERO)).unwrap();

        assert!(fired.0.load(Ordering::Acquire));
        assert!(!skipped.0.load(Ordering::Acquire));
    }
}
