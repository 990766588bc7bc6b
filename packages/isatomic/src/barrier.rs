use std::hint;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::trace;

/// Returned by [`StartBarrier::arrive_and_wait()`] when a participant gave up before arriving.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Abandoned;

/// Releases all participants of a race at (approximately) the same instant.
///
/// Waiting is done by spinning instead of parking the thread - waking up a parked thread takes
/// far longer than the race window we are trying to hit, so a blocking barrier would let the
/// first released workers finish a good part of their iterations before the last one starts.
///
/// Release is all-or-none: either all participants arrive and all of them are released, or one
/// of them calls [`abandon()`][Self::abandon] instead of arriving and every waiter gets
/// [`Abandoned`]. A participant that arrived can never be released into a race that is
/// missing participants.
#[derive(Debug)]
pub(crate) struct StartBarrier {
    participants: usize,
    arrived: AtomicUsize,
    abandoned: AtomicBool,
}

impl StartBarrier {
    pub(crate) fn new(participants: usize) -> Self {
        assert!(participants > 0, "a race needs at least one participant");

        Self {
            participants,
            arrived: AtomicUsize::new(0),
            abandoned: AtomicBool::new(false),
        }
    }

    /// Registers the calling participant and spins until all participants have arrived.
    pub(crate) fn arrive_and_wait(&self) -> Result<(), Abandoned> {
        // Release so that whatever the participant did before arriving (e.g. pinning itself)
        // is visible to the others once they are released. There is no ordering guarantee
        // beyond that - the race itself is deliberately unordered.
        self.arrived.fetch_add(1, Ordering::AcqRel);

        while self.arrived.load(Ordering::Acquire) < self.participants {
            if self.abandoned.load(Ordering::Acquire) {
                return Err(Abandoned);
            }

            hint::spin_loop();
        }

        trace!(participants = self.participants, "start barrier released");

        Ok(())
    }

    /// Gives up on the race instead of arriving. Any participants waiting (now or in the
    /// future) will be told that the race is abandoned.
    ///
    /// Must only be called by a participant that has not arrived. Because that participant
    /// never arrives, the barrier can never release anyone after this.
    pub(crate) fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
    }

    /// How many participants have arrived so far.
    #[cfg(test)]
    pub(crate) fn arrived(&self) -> usize {
        self.arrived.load(Ordering::Acquire)
    }
}
