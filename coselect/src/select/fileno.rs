use crate::error::{Error, Result};

use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};

/// Something that can be resolved to an OS file descriptor.
///
/// This is how [`select`](crate::select()) and [`Poll`](crate::Poll) accept
/// "any file-like object": plain descriptors, the standard library's
/// descriptor-owning types, and references to either.
///
/// The descriptor is resolved on every call and never cached.
pub trait Fileno {
    /// Returns the descriptor, or an error if it cannot be used.
    fn fileno(&self) -> Result<RawFd>;
}

impl Fileno for RawFd {
    fn fileno(&self) -> Result<RawFd> {
        if *self < 0 {
            return Err(Error::NegativeDescriptor(*self));
        }

        Ok(*self)
    }
}

impl<T: Fileno + ?Sized> Fileno for &T {
    fn fileno(&self) -> Result<RawFd> {
        (**self).fileno()
    }
}

macro_rules! impl_fileno {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Fileno for $ty {
                fn fileno(&self) -> Result<RawFd> {
                    Ok(self.as_raw_fd())
                }
            }
        )*
    };
}

impl_fileno!(
    std::fs::File,
    std::net::TcpStream,
    std::net::TcpListener,
    std::net::UdpSocket,
    std::os::unix::net::UnixStream,
    std::os::unix::net::UnixListener,
    std::os::unix::net::UnixDatagram,
    std::io::Stdin,
    std::io::Stdout,
    std::io::Stderr,
    std::process::ChildStdin,
    std::process::ChildStdout,
    std::process::ChildStderr,
    OwnedFd,
    BorrowedFd<'_>,
);
