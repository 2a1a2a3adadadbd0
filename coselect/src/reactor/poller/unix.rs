use libc::{F_GETFD, F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, O_NONBLOCK, c_int, close, fcntl};
use std::io;
use std::os::fd::RawFd;

/// Converts a libc return code into an `io::Result`, reading `errno` on failure.
pub(crate) fn cvt(rc: c_int) -> io::Result<c_int> {
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Fails with `EBADF` if `fd` is not an open descriptor.
pub(crate) fn sys_check_fd(fd: RawFd) -> io::Result<()> {
    cvt(unsafe { fcntl(fd, F_GETFD) })?;

    Ok(())
}

/// Sets a file descriptor to non-blocking mode.
#[cfg_attr(any(target_os = "linux", target_os = "android"), allow(dead_code))]
pub(crate) fn sys_set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = cvt(unsafe { fcntl(fd, F_GETFL) })?;
    cvt(unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) })?;

    Ok(())
}

/// Marks a file descriptor close-on-exec.
#[cfg_attr(any(target_os = "linux", target_os = "android"), allow(dead_code))]
pub(crate) fn sys_set_cloexec(fd: RawFd) -> io::Result<()> {
    let flags = cvt(unsafe { fcntl(fd, F_GETFD) })?;
    cvt(unsafe { fcntl(fd, F_SETFD, flags | FD_CLOEXEC) })?;

    Ok(())
}

/// Creates a non-blocking, close-on-exec pipe and returns `(read, write)`.
#[cfg_attr(any(target_os = "linux", target_os = "android"), allow(dead_code))]
pub(crate) fn sys_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds: [c_int; 2] = [-1; 2];
    cvt(unsafe { libc::pipe(fds.as_mut_ptr()) })?;

    for fd in fds {
        if let Err(err) = sys_set_nonblocking(fd).and_then(|_| sys_set_cloexec(fd)) {
            sys_close(fds[0]);
            sys_close(fds[1]);
            return Err(err);
        }
    }

    Ok((fds[0], fds[1]))
}

