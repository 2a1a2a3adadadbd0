//! Public `POLL*` event masks and their translation to watcher interest.

use crate::reactor::io::{EvFlags, Revents};

use bitflags::bitflags;

bitflags! {
    /// Event mask of the [`Poll`](crate::Poll) interface.
    ///
    /// Values are the platform's own, so some flags may alias each other
    /// (`OUT` and `WRNORM` on BSD-derived systems, for instance). Only `IN`
    /// and `OUT` influence what a registration waits for; the others are
    /// accepted and ignored. Results only ever carry `IN`, `OUT` and `NVAL`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PollFlags: i16 {
        /// There is data to read.
        const IN = libc::POLLIN;
        /// There is urgent data to read. Ignored on registration.
        const PRI = libc::POLLPRI;
        /// Writing is possible.
        const OUT = libc::POLLOUT;
        /// Error condition.
        const ERR = libc::POLLERR;
        /// Hang up.
        const HUP = libc::POLLHUP;
        /// Invalid request: the descriptor is not open.
        const NVAL = libc::POLLNVAL;
        /// Normal data may be read.
        const RDNORM = libc::POLLRDNORM;
        /// Priority data may be read.
        const RDBAND = libc::POLLRDBAND;
        /// Normal data may be written.
        const WRNORM = libc::POLLWRNORM;
        /// Priority data may be written.
        const WRBAND = libc::POLLWRBAND;
    }
}

pub const POLLIN: PollFlags = PollFlags::IN;
pub const POLLPRI: PollFlags = PollFlags::PRI;
pub const POLLOUT: PollFlags = PollFlags::OUT;
pub const POLLERR: PollFlags = PollFlags::ERR;
pub const POLLHUP: PollFlags = PollFlags::HUP;
pub const POLLNVAL: PollFlags = PollFlags::NVAL;
pub const POLLRDNORM: PollFlags = PollFlags::RDNORM;
pub const POLLRDBAND: PollFlags = PollFlags::RDBAND;
pub const POLLWRNORM: PollFlags = PollFlags::WRNORM;
pub const POLLWRBAND: PollFlags = PollFlags::WRBAND;

/// Watcher interest for a registration mask. No mask means read and write.
pub(crate) fn interest_from_mask(mask: Option<PollFlags>) -> EvFlags {
    let Some(mask) = mask else {
        return EvFlags::READ | EvFlags::WRITE;
    };

    let mut events = EvFlags::empty();
    if mask.contains(PollFlags::IN) {
        events |= EvFlags::READ;
    }
    if mask.contains(PollFlags::OUT) {
        events |= EvFlags::WRITE;
    }

    events
}

/// Result mask for a watcher delivery.
pub(crate) fn mask_from_revents(revents: Revents) -> PollFlags {
    match revents {
        Revents::Invalid => PollFlags::NVAL,
        Revents::Ready(events) => {
            let mut mask = PollFlags::empty();
            if events.contains(EvFlags::READ) {
                mask |= PollFlags::IN;
            }
            if events.contains(EvFlags::WRITE) {
                mask |= PollFlags::OUT;
            }
            mask
        }
    }
}
