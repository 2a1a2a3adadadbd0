//! Zero-timeout readiness check through the kernel's own `select()`.
//!
//! Run before any cooperative wait: it reports descriptors that are ready
//! right now and surfaces invalid descriptors (`EBADF`) as the native call
//! would.

use crate::error::{Error, Result};

use log::trace;
use std::io;
use std::mem::MaybeUninit;
use std::os::fd::RawFd;

/// Positions of the ready descriptors in each input list.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Preflight {
    pub(crate) readable: Vec<usize>,
    pub(crate) writable: Vec<usize>,
    pub(crate) exceptional: Vec<usize>,
}

impl Preflight {
    pub(crate) fn is_empty(&self) -> bool {
        self.readable.is_empty() && self.writable.is_empty() && self.exceptional.is_empty()
    }
}

struct FdSet(libc::fd_set);

impl FdSet {
    fn new(fds: &[RawFd]) -> Result<Self> {
        let mut set = MaybeUninit::<libc::fd_set>::uninit();

        let mut set = unsafe {
            libc::FD_ZERO(set.as_mut_ptr());
            set.assume_init()
        };

        for &fd in fds {
            if fd < 0 || fd as usize >= libc::FD_SETSIZE as usize {
                return Err(Error::DescriptorOutOfRange(fd));
            }

            unsafe { libc::FD_SET(fd, &mut set) };
        }

        Ok(Self(set))
    }

    fn contains(&self, fd: RawFd) -> bool {
        unsafe { libc::FD_ISSET(fd, &self.0) }
    }

    fn ready(&self, fds: &[RawFd]) -> Vec<usize> {
        fds.iter()
            .enumerate()
            .filter(|&(_, &fd)| self.contains(fd))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Asks the kernel which descriptors are ready, without waiting.
pub(crate) fn select_now(rfds: &[RawFd], wfds: &[RawFd], xfds: &[RawFd]) -> Result<Preflight> {
    if rfds.is_empty() && wfds.is_empty() && xfds.is_empty() {
        trace!("pre-flight skipped: no descriptors");
        return Ok(Preflight::default());
    }

    let mut rset = FdSet::new(rfds)?;
    let mut wset = FdSet::new(wfds)?;
    let mut xset = FdSet::new(xfds)?;

    let nfds = rfds
        .iter()
        .chain(wfds)
        .chain(xfds)
        .copied()
        .max()
        .map_or(0, |fd| fd + 1);

    let mut tv = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };

    let rc = unsafe { libc::select(nfds, &mut rset.0, &mut wset.0, &mut xset.0, &mut tv) };
    if rc < 0 {
        return Err(Error::Os(io::Error::last_os_error()));
    }

    if rc == 0 {
        return Ok(Preflight::default());
    }

    Ok(Preflight {
        readable: rset.ready(rfds),
        writable: wset.ready(wfds),
        exceptional: xset.ready(xfds),
    })
}
