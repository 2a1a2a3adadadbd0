use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Errors surfaced by [`select`](crate::select()) and [`Poll`](crate::Poll).
///
/// Platform failures are carried unchanged in [`Error::Os`], so callers that
/// match on `errno` values (for instance `EBADF` from the pre-flight check)
/// keep working.
#[derive(Debug, Error)]
pub enum Error {
    /// A timeout was negative or not a number.
    #[error("timeout must be a non-negative number, got {0}")]
    InvalidTimeout(f64),

    /// A descriptor resolved to a negative integer.
    #[error("file descriptor cannot be a negative integer ({0})")]
    NegativeDescriptor(RawFd),

    /// A descriptor does not fit in an `fd_set`.
    #[error("file descriptor {0} out of range in select()")]
    DescriptorOutOfRange(RawFd),

    /// `unregister` was called for a descriptor that was never registered.
    #[error("file descriptor {0} is not registered")]
    NotRegistered(RawFd),

    /// An error reported by the operating system.
    #[error(transparent)]
    Os(#[from] io::Error),
}

impl Error {
    /// Returns the OS error code, if this error came from the platform.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Os(err) => err.raw_os_error(),
            _ => None,
        }
    }

    /// Returns `true` for an interrupted system call (`EINTR`).
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Os(err) if err.kind() == io::ErrorKind::Interrupted)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Os(err) => err,
            Error::NotRegistered(_) => io::Error::new(io::ErrorKind::NotFound, err),
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
