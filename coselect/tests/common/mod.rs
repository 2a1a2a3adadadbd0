#![allow(dead_code)]

use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A connected socket pair; both ends start writable and not readable.
pub fn pair() -> (UnixStream, UnixStream) {
    UnixStream::pair().expect("socketpair")
}

/// A descriptor number that was valid a moment ago and is now closed.
///
/// The descriptor is duplicated at or above `floor` before being closed,
/// so that concurrently running tests do not reopen it.
pub fn closed_fd(floor: RawFd) -> RawFd {
    let (a, _b) = pair();

    let fd = unsafe { libc::fcntl(a.as_raw_fd(), libc::F_DUPFD_CLOEXEC, floor) };
    assert!(fd >= 0, "F_DUPFD failed");
    assert_eq!(unsafe { libc::close(fd) }, 0);

    fd
}

/// CPU time consumed so far by the calling thread.
pub fn thread_cpu_time() -> Duration {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    let who = libc::RUSAGE_THREAD;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let who = libc::RUSAGE_SELF;

    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    assert_eq!(unsafe { libc::getrusage(who, &mut usage) }, 0);

    let time = |tv: libc::timeval| {
        Duration::from_secs(tv.tv_sec as u64) + Duration::from_micros(tv.tv_usec as u64)
    };

    time(usage.ru_utime) + time(usage.ru_stime)
}
