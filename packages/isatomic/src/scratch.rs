use std::cell::UnsafeCell;
use std::fmt::{self, Debug};

use static_assertions::const_assert_eq;

use crate::{CACHE_LINE_BYTES, SCRATCH_REGION_BYTES};

/// The memory block that all workers of a race load from and store to, without any
/// synchronization.
///
/// The region is aligned to a cache line boundary, so the offsets defined by
/// [`Mode::offset()`][crate::Mode::offset] have the same placement relative to cache lines
/// as they have relative to the start of the region.
///
/// The contents are only ever accessed via the inline assembly in the access strategies.
/// Rust code never reads or writes the bytes, which keeps the deliberate data race outside
/// the Rust abstract machine.
#[repr(C, align(64))]
pub struct ScratchRegion {
    bytes: UnsafeCell<[u8; SCRATCH_REGION_BYTES]>,
}

const_assert_eq!(align_of::<ScratchRegion>(), CACHE_LINE_BYTES);
const_assert_eq!(size_of::<ScratchRegion>(), SCRATCH_REGION_BYTES);

// SAFETY: All access to the contents happens via single machine instructions in inline
// assembly, for which a concurrent access is a race on the hardware level (the thing we
// measure) rather than a data race in the Rust sense.
unsafe impl Sync for ScratchRegion {}

impl ScratchRegion {
    /// Creates a zero-filled region, so the first load of any worker sees the all-clear pattern.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: UnsafeCell::new([0; SCRATCH_REGION_BYTES]),
        }
    }

    /// Pointer to the byte at `offset`. The caller may use it for raw accesses that stay
    /// within the region.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not inside the region.
    #[must_use]
    pub fn at(&self, offset: usize) -> *mut u8 {
        assert!(
            offset < SCRATCH_REGION_BYTES,
            "offset {offset} is outside the {SCRATCH_REGION_BYTES}-byte scratch region"
        );

        self.bytes.get().cast::<u8>().wrapping_add(offset)
    }
}

impl Default for ScratchRegion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl Debug for ScratchRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reading the contents could race with the workers, so we only show the address.
        f.debug_struct("ScratchRegion")
            .field("address", &self.bytes.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ScratchRegion: Send, Sync);

    #[test]
    fn base_is_cache_line_aligned() {
        let region = ScratchRegion::new();

        assert_eq!(region.at(0).addr() % CACHE_LINE_BYTES, 0);
    }

    #[test]
    fn offsets_are_relative_to_base() {
        let region = ScratchRegion::new();

        assert_eq!(region.at(56).addr() - region.at(0).addr(), 56);
    }

    #[test]
    #[should_panic]
    fn offset_outside_region_panics() {
        let region = ScratchRegion::new();

        _ = region.at(SCRATCH_REGION_BYTES);
    }
}
